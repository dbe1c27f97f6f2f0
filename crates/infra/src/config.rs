//! Process configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RIDERSHIP_LISTEN_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset: in-memory stores |
//! | `RIDERSHIP_SOURCE_PATH` | unset: ingest requires a request body |
//! | `RIDERSHIP_DELIMITER` | `;` |

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use ridership_analytics::{DEFAULT_DELIMITER, WideTableParser};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid RIDERSHIP_LISTEN_ADDR `{value}`: {source}")]
    InvalidListenAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    #[error("RIDERSHIP_DELIMITER must be a single character, got `{0}`")]
    InvalidDelimiter(String),

    #[error("no ingest source configured (set RIDERSHIP_SOURCE_PATH or send a request body)")]
    MissingSource,

    #[error("failed to read ingest source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory stores.
    pub database_url: Option<String>,
    /// Default wide-table file used when an ingest request carries no body.
    pub source_path: Option<PathBuf>,
    pub delimiter: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            source_path: None,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr = get("RIDERSHIP_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidListenAddr {
                value: listen_addr.clone(),
                source,
            })?;

        // Not trimmed: a tab is a valid delimiter.
        let delimiter = match lookup("RIDERSHIP_DELIMITER").filter(|v| !v.is_empty()) {
            None => DEFAULT_DELIMITER,
            Some(raw) => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(ConfigError::InvalidDelimiter(raw)),
                }
            }
        };

        Ok(Self {
            listen_addr,
            database_url: get("DATABASE_URL"),
            source_path: get("RIDERSHIP_SOURCE_PATH").map(PathBuf::from),
            delimiter,
        })
    }

    pub fn parser(&self) -> WideTableParser {
        WideTableParser::new().with_delimiter(self.delimiter)
    }

    /// Read the configured default ingest source.
    pub fn load_source(&self) -> Result<String, ConfigError> {
        let path = self.source_path.as_ref().ok_or(ConfigError::MissingSource)?;
        std::fs::read_to_string(path).map_err(|source| ConfigError::SourceRead {
            path: path.clone(),
            source,
        })
    }
}
