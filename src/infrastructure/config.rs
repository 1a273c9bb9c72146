use crate::infrastructure::error::AgendaError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FetchFailurePolicy {
    AbortAll,
    SkipFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u64,
    pub timezone: String,
    pub completion_delay_ms: u64,
    pub fetch_failure_policy: FetchFailurePolicy,
    pub retry: RetryConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            timezone: "UTC".to_string(),
            completion_delay_ms: 300,
            fetch_failure_policy: FetchFailurePolicy::AbortAll,
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 200,
            },
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), AgendaError> {
        if self.schema != SUPPORTED_SCHEMA {
            return Err(AgendaError::InvalidConfig(format!(
                "unsupported schema {}",
                self.schema
            )));
        }
        self.timezone()?;
        self.log_level()?;
        if self.retry.max_attempts == 0 {
            return Err(AgendaError::InvalidConfig(
                "retry.maxAttempts must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, AgendaError> {
        self.timezone.trim().parse::<Tz>().map_err(|error| {
            AgendaError::InvalidConfig(format!("invalid timezone '{}': {error}", self.timezone))
        })
    }

    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }

    pub fn log_level(&self) -> Result<log::LevelFilter, AgendaError> {
        self.log_level.trim().parse::<log::LevelFilter>().map_err(|_| {
            AgendaError::InvalidConfig(format!("invalid logLevel '{}'", self.log_level))
        })
    }
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), AgendaError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, AgendaError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| AgendaError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(AgendaError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, AgendaError> {
    let path = config_dir.join(APP_JSON);
    let parsed = read_config(&path)?;
    let mut merged = serde_json::to_value(AppConfig::default())?;
    if let (Some(target), Some(source)) = (merged.as_object_mut(), parsed.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    let config: AppConfig = serde_json::from_value(merged).map_err(|error| {
        AgendaError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_app_config(config_dir: &Path, config: &AppConfig) -> Result<(), AgendaError> {
    config.validate()?;
    let formatted = serde_json::to_string_pretty(config)?;
    fs::write(config_dir.join(APP_JSON), format!("{formatted}\n"))?;
    Ok(())
}
