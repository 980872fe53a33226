// 🔁 Upload pipeline
// One file start-to-finish: extract → normalize → store → chart data

use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::analytics::{summarize, ChartData, StatementSummary};
use crate::db::StatementStore;
use crate::error::Result;
use crate::normalizer::{normalize, Statement};
use crate::parser::{extract, ParseWarning, SourceFormat};

/// Everything the presentation side needs after a successful upload
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedUpload {
    pub id: i64,
    pub filename: String,
    pub source_format: SourceFormat,
    pub rows_read: usize,
    pub statement: Statement,
    pub summary: StatementSummary,
    pub charts: ChartData,
    pub warnings: Vec<ParseWarning>,
}

impl ProcessedUpload {
    /// Rows dropped by normalization
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.statement.len()
    }
}

/// Parse and normalize without touching the store
pub fn parse_statement(bytes: &[u8], filename: &str) -> Result<(Statement, Vec<ParseWarning>, usize)> {
    let raw = extract(bytes, filename)?;
    let statement = normalize(&raw)?;
    Ok((statement, raw.warnings, raw.records.len()))
}

/// Process one upload; any fatal error returns before anything is stored
pub fn process_upload(store: &StatementStore, filename: &str, bytes: &[u8]) -> Result<ProcessedUpload> {
    let span = info_span!("upload", file = filename, bytes = bytes.len());
    let _guard = span.enter();

    let raw = extract(bytes, filename).inspect_err(|e| warn!(error = %e, "extraction failed"))?;
    let statement = normalize(&raw).inspect_err(|e| warn!(error = %e, "normalization failed"))?;
    let id = store.put(filename, &statement)?;

    let upload = ProcessedUpload {
        id,
        filename: filename.to_string(),
        source_format: raw.source_format,
        rows_read: raw.records.len(),
        summary: summarize(&statement),
        charts: ChartData::from_statement(&statement),
        statement,
        warnings: raw.warnings,
    };

    info!(
        rows = upload.statement.len(),
        dropped = upload.rows_dropped(),
        warnings = upload.warnings.len(),
        "upload processed"
    );
    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatementError;

    #[test]
    fn test_csv_upload_is_stored_and_charted() {
        let store = StatementStore::open_in_memory().unwrap();
        let csv = "Date,Amount,Category\n\
                   2024-01-05,\"1,200.50\",Equity\n\
                   bad,10,Cash\n\
                   2024-01-07,300,Cash\n";

        let upload = process_upload(&store, "jan.csv", csv.as_bytes()).unwrap();

        assert_eq!(upload.source_format, SourceFormat::Delimited);
        assert_eq!(upload.statement.len(), 2);
        assert_eq!(upload.rows_dropped(), 1);
        assert_eq!(upload.charts.equity_exposure.last().unwrap().cumulative, 1200.50);
        assert_eq!(store.get_latest("jan.csv").unwrap(), Some(upload.statement.clone()));
    }

    #[test]
    fn test_fatal_error_stores_nothing() {
        let store = StatementStore::open_in_memory().unwrap();

        let schema = process_upload(&store, "bad.csv", b"Date,Value\n2024-01-01,1\n");
        assert!(matches!(schema, Err(StatementError::Schema { .. })));

        let empty = process_upload(&store, "bad.csv", b"Date,Amount,Category\nx,y,z\n");
        assert!(matches!(empty, Err(StatementError::EmptyResult)));

        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_parse_statement_keeps_store_out() {
        let (statement, warnings, rows_read) =
            parse_statement(b"Date,Amount,Category\n2024-01-01,5,ETF\n", "x.csv").unwrap();

        assert_eq!(statement.records()[0].equity_exposure, 5.0);
        assert!(warnings.is_empty());
        assert_eq!(rows_read, 1);
    }
}
