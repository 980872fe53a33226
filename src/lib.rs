// Statement Analyzer - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod parser;     // Extraction: PDF / CSV / spreadsheet → raw rows
pub mod normalizer; // Typed rows + derived metrics
pub mod analytics;  // Chart series and summaries
pub mod db;         // Versioned statement store
pub mod pipeline;   // extract → normalize → store
pub mod config;
pub mod logging;

#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use error::{Result, StatementError};
pub use parser::{
    StatementParser, DelimitedParser, SpreadsheetParser, PdfParser,
    RawRecord, RawStatement, ParseWarning, SourceFormat,
    detect_format, get_parser, extract, extract_from_text,
};
pub use normalizer::{
    Statement, TransactionRecord,
    normalize, equity_exposure, risk_score, category_weight,
};
pub use analytics::{
    ChartData, ExposurePoint, CategoryTotal, StatementSummary,
    equity_exposure_series, composition_by_category, summarize,
};
pub use db::{
    StatementStore, StoredStatement, StatementVersion, FileSummary,
    setup_database,
};
pub use pipeline::{ProcessedUpload, process_upload, parse_statement};
pub use config::Config;
pub use logging::{LogFormat, init_logging};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
