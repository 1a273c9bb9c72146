use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Provider temporarily failed: {0}")]
    ProviderTransient(String),
    #[error("Fetch failed for source {source_id}: {message}")]
    FetchFailure { source_id: String, message: String },
    #[error("Persist failed for item {item_id}: {message}")]
    PersistFailure { item_id: String, message: String },
    #[error("Decode failure: {0}")]
    Decode(String),
}

impl AgendaError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderTransient(_))
    }

    pub(crate) fn poisoned(what: &str, error: impl std::fmt::Display) -> Self {
        Self::InvalidConfig(format!("{what} lock poisoned: {error}"))
    }
}
