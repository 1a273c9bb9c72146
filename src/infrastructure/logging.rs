use crate::infrastructure::error::AgendaError;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const LOG_FILE_NAME: &str = "agenda.log";

pub struct JsonLinesLogger {
    path: PathBuf,
    level: log::LevelFilter,
    guard: Mutex<()>,
}

impl JsonLinesLogger {
    pub fn new(logs_dir: &Path, level: log::LevelFilter) -> Self {
        Self {
            path: logs_dir.join(LOG_FILE_NAME),
            level,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, level: log::Level, target: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level.as_str().to_ascii_lowercase(),
            "target": target,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

impl log::Log for JsonLinesLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.append(record.level(), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}

pub fn init_logging(logs_dir: &Path, level: log::LevelFilter) -> Result<(), AgendaError> {
    std::fs::create_dir_all(logs_dir)?;
    log::set_boxed_logger(Box::new(JsonLinesLogger::new(logs_dir, level)))
        .map_err(|error| AgendaError::InvalidConfig(format!("logger already installed: {error}")))?;
    log::set_max_level(level);
    Ok(())
}
