use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config directory not found at {0}. Run 'ledger init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value for '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid filter '{name}': {reason}")]
    InvalidQuery { name: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Server responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Could not load {kind} accounts: {message}")]
    FetchFailed { kind: String, message: String },

    #[error("Could not read server response: {0}")]
    Decode(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Deleting accounts requires the admin role (current role: {0})")]
    Forbidden(String),

    #[error("Refusing to delete {0} without --yes")]
    DeleteNotConfirmed(String),

    #[error("Failed to read selection store {path}: {reason}")]
    SelectionStore { path: PathBuf, reason: String },

    #[error("Selection store version {0} is newer than this build supports")]
    UnsupportedSelectionVersion(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid_query(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
