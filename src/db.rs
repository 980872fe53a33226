// 🗄️ Statement Store
// Append-only SQLite log of normalized statements, newest version wins on read

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::{Result, StatementError};
use crate::normalizer::Statement;

/// A stored version together with its table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredStatement {
    pub id: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub statement: Statement,
}

/// Version metadata without the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementVersion {
    pub id: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub row_count: i64,
}

/// Per-filename summary for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub filename: String,
    pub versions: i64,
    pub last_upload: DateTime<Utc>,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS statements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            upload_date TEXT NOT NULL,
            data_json TEXT NOT NULL,
            row_count INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_statements_filename
         ON statements(filename, upload_date)",
        [],
    )?;

    Ok(())
}

/// Owns the single connection; every call goes through one mutex
pub struct StatementStore {
    conn: Mutex<Connection>,
}

impl StatementStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(StatementStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StatementError::Storage("statement store lock poisoned".to_string()))
    }

    /// Append a new version; earlier versions are never touched
    pub fn put(&self, filename: &str, statement: &Statement) -> Result<i64> {
        let data_json = statement.to_json()?;
        let uploaded_at = format_timestamp(&Utc::now());

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO statements (filename, upload_date, data_json, row_count)
             VALUES (?1, ?2, ?3, ?4)",
            params![filename, uploaded_at, data_json, statement.len() as i64],
        )?;
        let id = conn.last_insert_rowid();

        info!(file = filename, id, rows = statement.len(), "statement stored");
        Ok(id)
    }

    /// Most recently appended table for a filename
    pub fn get_latest(&self, filename: &str) -> Result<Option<Statement>> {
        Ok(self.latest_entry(filename)?.map(|entry| entry.statement))
    }

    pub fn latest_entry(&self, filename: &str) -> Result<Option<StoredStatement>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT id, filename, upload_date, data_json
                 FROM statements
                 WHERE filename = ?1
                 ORDER BY upload_date DESC, id DESC
                 LIMIT 1",
                params![filename],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        parse_timestamp(2, &row.get::<_, String>(2)?)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, filename, uploaded_at, data_json)) => Ok(Some(StoredStatement {
                id,
                filename,
                uploaded_at,
                statement: Statement::from_json(&data_json)?,
            })),
            None => Ok(None),
        }
    }

    /// All versions of one file, newest first
    pub fn history(&self, filename: &str) -> Result<Vec<StatementVersion>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, upload_date, row_count
             FROM statements
             WHERE filename = ?1
             ORDER BY upload_date DESC, id DESC",
        )?;

        let versions = stmt
            .query_map(params![filename], |row| {
                Ok(StatementVersion {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    uploaded_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                    row_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(versions)
    }

    pub fn list_files(&self) -> Result<Vec<FileSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT filename, COUNT(*), MAX(upload_date)
             FROM statements
             GROUP BY filename
             ORDER BY filename",
        )?;

        let files = stmt
            .query_map([], |row| {
                Ok(FileSummary {
                    filename: row.get(0)?,
                    versions: row.get(1)?,
                    last_upload: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(files)
    }

    /// Total stored versions across all files
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM statements", [], |row| row.get(0))?;

        Ok(count)
    }
}

// Fixed-width UTC text so lexical order matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
