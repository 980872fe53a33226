// Error types for statement processing
// Fatal kinds abort an upload; parse warnings live on the raw statement instead

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, StatementError>;

#[derive(Debug, Error)]
pub enum StatementError {
    // ── Pipeline (user-facing) ──────────────────────────────────────
    #[error("Missing required columns {missing:?} (required {required:?}, found {found:?})")]
    Schema {
        required: Vec<String>,
        found: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Unreadable statement file: {0}")]
    Format(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("No valid rows left after dropping invalid dates and amounts")]
    EmptyResult,

    // ── Infrastructure ──────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StatementError {
    /// Build a schema error from the columns a reader actually saw
    pub fn missing_columns(required: &[&str], found: &[String]) -> Self {
        let missing = required
            .iter()
            .filter(|col| !found.iter().any(|f| f == *col))
            .map(|col| col.to_string())
            .collect();

        StatementError::Schema {
            required: required.iter().map(|c| c.to_string()).collect(),
            found: found.to_vec(),
            missing,
        }
    }

    /// True for the four kinds that reject the uploaded file itself
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            StatementError::Schema { .. }
                | StatementError::Format(_)
                | StatementError::Extraction(_)
                | StatementError::EmptyResult
        )
    }
}
