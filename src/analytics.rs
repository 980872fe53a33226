// 📊 Chart data
// Series behind the two dashboard charts plus a one-line summary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalizer::Statement;

pub const EQUITY_CHART_TITLE: &str = "Cumulative Equity Exposure Over Time";
pub const COMPOSITION_CHART_TITLE: &str = "Portfolio Composition";

/// One point of the cumulative equity exposure line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposurePoint {
    pub date: NaiveDate,
    pub cumulative: f64,
}

/// Sum of amounts for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

/// Both chart inputs for one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub equity_exposure: Vec<ExposurePoint>,
    pub composition: Vec<CategoryTotal>,
}

impl ChartData {
    pub fn from_statement(statement: &Statement) -> Self {
        ChartData {
            equity_exposure: equity_exposure_series(statement),
            composition: composition_by_category(statement),
        }
    }
}

/// Headline numbers shown next to the charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub row_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub total_inflow: f64,
    pub total_outflow: f64,
    pub net_equity_exposure: f64,
    pub mean_risk_score: f64,
    pub max_risk_score: f64,
}

/// Running sum of `equity_exposure`, in row order
pub fn equity_exposure_series(statement: &Statement) -> Vec<ExposurePoint> {
    statement
        .iter()
        .scan(0.0, |running, record| {
            *running += record.equity_exposure;
            Some(ExposurePoint {
                date: record.date,
                cumulative: *running,
            })
        })
        .collect()
}

/// `sum(amount)` per category, ordered by category label
pub fn composition_by_category(statement: &Statement) -> Vec<CategoryTotal> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for record in statement {
        let entry = groups.entry(record.category.as_str()).or_insert((0.0, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
        })
        .collect()
}

pub fn summarize(statement: &Statement) -> StatementSummary {
    let records = statement.records();

    let mut first_date = records[0].date;
    let mut last_date = records[0].date;
    let mut total_inflow = 0.0;
    let mut total_outflow = 0.0;
    let mut net_equity_exposure = 0.0;
    let mut risk_sum = 0.0;
    let mut max_risk_score = f64::MIN;

    for record in records {
        first_date = first_date.min(record.date);
        last_date = last_date.max(record.date);

        if record.amount >= 0.0 {
            total_inflow += record.amount;
        } else {
            total_outflow += record.amount;
        }

        net_equity_exposure += record.equity_exposure;
        risk_sum += record.risk_score;
        max_risk_score = max_risk_score.max(record.risk_score);
    }

    StatementSummary {
        row_count: records.len(),
        first_date,
        last_date,
        total_inflow,
        total_outflow,
        net_equity_exposure,
        mean_risk_score: risk_sum / records.len() as f64,
        max_risk_score,
    }
}
