use crate::domain::models::{Item, SourceKind};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TogglePlan {
    DeferComplete { delay: Duration },
    UncompleteNow,
    Ignore,
}

#[derive(Debug, Clone)]
pub struct CompletionGuard {
    delay: Duration,
    completing: HashSet<String>,
}

impl Default for CompletionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETION_DELAY)
    }
}

impl CompletionGuard {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            completing: HashSet::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn plan(&mut self, item: &Item) -> Result<TogglePlan, String> {
        if item.kind == SourceKind::Event {
            return Err(format!("item {} is an event and cannot be completed", item.id));
        }
        if self.completing.contains(&item.id) {
            return Ok(TogglePlan::Ignore);
        }
        if item.is_completed {
            return Ok(TogglePlan::UncompleteNow);
        }
        self.completing.insert(item.id.clone());
        Ok(TogglePlan::DeferComplete { delay: self.delay })
    }

    pub fn is_completing(&self, item_id: &str) -> bool {
        self.completing.contains(item_id)
    }

    pub fn finish(&mut self, item_id: &str) -> bool {
        self.completing.remove(item_id)
    }

    pub fn completing_count(&self) -> usize {
        self.completing.len()
    }
}
