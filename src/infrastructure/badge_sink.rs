use crate::infrastructure::error::AgendaError;
use async_trait::async_trait;
use std::sync::Mutex;

#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_badge_count(&self, count: u32) -> Result<(), AgendaError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogBadgeSink;

#[async_trait]
impl BadgeSink for LogBadgeSink {
    async fn set_badge_count(&self, count: u32) -> Result<(), AgendaError> {
        log::info!("badge count set to {count}");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingBadgeSink {
    counts: Mutex<Vec<u32>>,
}

impl RecordingBadgeSink {
    pub fn counts(&self) -> Vec<u32> {
        self.counts
            .lock()
            .map(|counts| counts.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<u32> {
        self.counts().last().copied()
    }
}

#[async_trait]
impl BadgeSink for RecordingBadgeSink {
    async fn set_badge_count(&self, count: u32) -> Result<(), AgendaError> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|error| AgendaError::poisoned("badge sink", error))?;
        counts.push(count);
        Ok(())
    }
}
