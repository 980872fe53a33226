// ⚙️ Configuration
// TOML file plus environment overrides, shared by the CLI and the server

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StatementError};
use crate::logging::LogFormat;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "statement-analyzer.toml";

pub const DB_ENV: &str = "STATEMENT_ANALYZER_DB";
pub const BIND_ENV: &str = "STATEMENT_ANALYZER_BIND";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    /// Largest accepted upload body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive; `RUST_LOG` still wins
    pub level: String,
    pub format: LogFormat,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("financial_statements.db"),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| StatementError::Config(e.to_string()))
    }

    /// Explicit path must exist; otherwise the default file is optional
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match path {
            Some(p) => Self::from_toml(&fs::read_to_string(p)?)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_toml(&fs::read_to_string(default)?)?
                } else {
                    Config::default()
                }
            }
        };

        Ok(config.with_env_overrides(lookup))
    }

    /// Apply env overrides through a lookup so tests need not touch the process env
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DB_ENV).filter(|v| !v.is_empty()) {
            self.database.path = PathBuf::from(db);
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.database.path, PathBuf::from("financial_statements.db"));
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            "[database]\npath = \"/tmp/x.db\"\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        assert_eq!(cfg.database.path, PathBuf::from("/tmp/x.db"));
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml("[database\npath=").unwrap_err();
        assert!(matches!(err, StatementError::Config(_)));
        assert!(!err.is_user_facing(), "a broken config is not an upload problem");
    }

    #[test]
    fn test_env_overrides() {
        let cfg = Config::default().with_env_overrides(|key| match key {
            DB_ENV => Some("env.db".to_string()),
            BIND_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(cfg.database.path, PathBuf::from("env.db"));
        assert_eq!(cfg.server.bind, "0.0.0.0:3000");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nbind = \"127.0.0.1:8080\"\n").unwrap();

        let cfg = Config::load_with_env(Some(&path), |_| None).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.database.path, PathBuf::from("financial_statements.db"));

        let cfg = Config::load_with_env(Some(&path), |key| {
            (key == BIND_ENV).then(|| "10.0.0.1:9000".to_string())
        })
        .unwrap();
        assert_eq!(cfg.server.bind, "10.0.0.1:9000", "env wins over the file");

        let missing = Config::load_with_env(Some(&dir.path().join("missing.toml")), |_| None);
        assert!(matches!(missing, Err(StatementError::Io(_))));
    }
}
