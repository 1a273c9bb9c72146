use crate::infrastructure::error::AgendaError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

pub const HIDDEN_TASK_SOURCES_KEY: &str = "hidden-task-sources";
pub const HIDDEN_EVENT_SOURCES_KEY: &str = "hidden-event-sources";
pub const MANUAL_ORDER_KEY_PREFIX: &str = "manual-order";
pub const BADGE_ENABLED_KEY: &str = "badge-enabled";
pub const ACCENT_SELECTION_KEY: &str = "accent-selection";

pub type SettingsUpdate<'a> = &'a mut dyn FnMut(Option<&[u8]>) -> Option<Vec<u8>>;

pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AgendaError>;
    fn store(&self, key: &str, value: &[u8]) -> Result<(), AgendaError>;
    /// Read-modify-write as a single step; concurrent updates never interleave.
    fn update(&self, key: &str, apply: SettingsUpdate<'_>) -> Result<(), AgendaError>;
}

const UPSERT_SQL: &str = "INSERT INTO settings (key, value, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET
       value = excluded.value,
       updated_at = excluded.updated_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteSettingsStore {
    db_path: PathBuf,
}

impl SqliteSettingsStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, AgendaError> {
        let connection = Connection::open(&self.db_path)?;
        // Writers queue on the database lock instead of failing with SQLITE_BUSY.
        connection.busy_timeout(BUSY_TIMEOUT)?;
        Ok(connection)
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AgendaError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), AgendaError> {
        let connection = self.connect()?;
        connection.execute(UPSERT_SQL, params![key, value, Utc::now().to_rfc3339()])?;
        Ok(())
    }

    fn update(&self, key: &str, apply: SettingsUpdate<'_>) -> Result<(), AgendaError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<Vec<u8>> = transaction
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(next) = apply(current.as_deref()) {
            transaction.execute(UPSERT_SQL, params![key, next, Utc::now().to_rfc3339()])?;
        }
        transaction.commit()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemorySettingsStore {
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AgendaError> {
        let values = self
            .values
            .lock()
            .map_err(|error| AgendaError::poisoned("settings store", error))?;
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &[u8]) -> Result<(), AgendaError> {
        let mut values = self
            .values
            .lock()
            .map_err(|error| AgendaError::poisoned("settings store", error))?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn update(&self, key: &str, apply: SettingsUpdate<'_>) -> Result<(), AgendaError> {
        let mut values = self
            .values
            .lock()
            .map_err(|error| AgendaError::poisoned("settings store", error))?;
        if let Some(next) = apply(values.get(key).map(Vec::as_slice)) {
            values.insert(key.to_string(), next);
        }
        Ok(())
    }
}
