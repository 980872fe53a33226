// 📐 Statement Normalizer
// Coerces raw records into typed rows and derives equity exposure + risk score

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatementError};
use crate::parser::{parse_amount, RawStatement, REQUIRED_COLUMNS};

/// Labels counted as equity-like for exposure (compared lower-cased)
pub const EQUITY_LABELS: &[&str] = &["equity", "stock", "etf"];

/// Risk weight per category label
pub const RISK_WEIGHTS: &[(&str, f64)] = &[
    ("Equity", 1.5),
    ("Fixed Income", 0.8),
    ("Cash", 0.2),
    ("Real Estate", 1.2),
    ("Alternative", 1.8),
    ("Other", 1.0),
];

/// Weight for any label not in the table
pub const DEFAULT_RISK_WEIGHT: f64 = 1.0;

/// Amounts are scaled by this before weighting
pub const RISK_SCALE: f64 = 10_000.0;

/// Date layouts accepted from structured files, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d-%b-%Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

// ============================================================================
// NORMALIZED TYPES
// ============================================================================

/// One normalized row; column names match the serialized table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,

    #[serde(rename = "Amount")]
    pub amount: f64,

    #[serde(rename = "Category")]
    pub category: String,

    pub equity_exposure: f64,

    pub risk_score: f64,
}

impl TransactionRecord {
    /// Build a row, deriving both metrics from (category, amount)
    pub fn new(date: NaiveDate, amount: f64, category: &str) -> Self {
        TransactionRecord {
            date,
            amount,
            category: category.to_string(),
            equity_exposure: equity_exposure(category, amount),
            risk_score: risk_score(category, amount),
        }
    }

    pub fn is_equity(&self) -> bool {
        is_equity_category(&self.category)
    }
}

/// Statement - the normalized table, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TransactionRecord>", into = "Vec<TransactionRecord>")]
pub struct Statement {
    records: Vec<TransactionRecord>,
}

impl Statement {
    /// Wrap already-normalized rows; an empty table is rejected
    pub fn from_records(records: Vec<TransactionRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(StatementError::EmptyResult);
        }
        Ok(Statement { records })
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TransactionRecord> {
        self.records.iter()
    }

    /// Serialize to the JSON blob kept by the store
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<TransactionRecord> = serde_json::from_str(json)?;
        Statement::from_records(records)
    }
}

impl TryFrom<Vec<TransactionRecord>> for Statement {
    type Error = StatementError;

    fn try_from(records: Vec<TransactionRecord>) -> Result<Self> {
        Statement::from_records(records)
    }
}

impl From<Statement> for Vec<TransactionRecord> {
    fn from(statement: Statement) -> Self {
        statement.records
    }
}

impl<'a> IntoIterator for &'a Statement {
    type Item = &'a TransactionRecord;
    type IntoIter = std::slice::Iter<'a, TransactionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Turn raw records into the normalized table
///
/// Rows with an unparseable date or amount are dropped; row order is kept.
pub fn normalize(raw: &RawStatement) -> Result<Statement> {
    if !REQUIRED_COLUMNS
        .iter()
        .all(|col| raw.columns.iter().any(|c| c == col))
    {
        return Err(StatementError::missing_columns(&REQUIRED_COLUMNS, &raw.columns));
    }

    let mut records = Vec::with_capacity(raw.records.len());
    let mut dropped = 0usize;

    for row in &raw.records {
        match (coerce_date(&row.date), coerce_amount(&row.amount)) {
            (Some(date), Some(amount)) => {
                records.push(TransactionRecord::new(date, amount, row.category.trim()));
            }
            _ => {
                dropped += 1;
                debug!(
                    file = %raw.source_file,
                    line = row.line_number,
                    date = %row.date,
                    amount = %row.amount,
                    "dropping row with invalid date or amount"
                );
            }
        }
    }

    debug!(
        file = %raw.source_file,
        kept = records.len(),
        dropped,
        "normalization finished"
    );

    Statement::from_records(records)
}

/// Lenient calendar-date coercion; `None` marks the row invalid
pub fn coerce_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

/// Numeric coercion; `None` marks the row invalid
pub fn coerce_amount(text: &str) -> Option<f64> {
    parse_amount(text)
}

// ============================================================================
// DERIVED METRICS (pure functions of category + amount)
// ============================================================================

pub fn is_equity_category(category: &str) -> bool {
    let lower = category.trim().to_lowercase();
    EQUITY_LABELS.iter().any(|label| *label == lower)
}

/// `amount` for equity-like categories, else zero
pub fn equity_exposure(category: &str, amount: f64) -> f64 {
    if is_equity_category(category) {
        amount
    } else {
        0.0
    }
}

/// Weight table lookup, case-insensitive, default 1.0
pub fn category_weight(category: &str) -> f64 {
    let label = category.trim();

    RISK_WEIGHTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, weight)| *weight)
        .unwrap_or(DEFAULT_RISK_WEIGHT)
}

/// `weight(category) * |amount| / 10000`
pub fn risk_score(category: &str, amount: f64) -> f64 {
    category_weight(category) * (amount.abs() / RISK_SCALE)
}

// ============================================================================
// TESTS
// ============================================================================
