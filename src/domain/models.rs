use crate::domain::window::WindowSelector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Event,
    Task,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub color: String,
    pub kind: SourceKind,
}

impl Source {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "source.id")?;
        validate_non_empty(&self.title, "source.title")?;
        Ok(())
    }

    pub fn is_mutable(&self) -> bool {
        self.kind == SourceKind::Task
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub source_id: String,
    pub kind: SourceKind,
    pub due_at: Option<DateTime<Utc>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub has_recurrence: bool,
    pub priority: i32,
    pub notes: Option<String>,
}

impl Item {
    pub fn task(
        id: impl Into<String>,
        title: impl Into<String>,
        source_id: impl Into<String>,
        due_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_id: source_id.into(),
            kind: SourceKind::Task,
            due_at,
            start_at: None,
            end_at: None,
            is_completed: false,
            completed_at: None,
            has_recurrence: false,
            priority: 0,
            notes: None,
        }
    }

    pub fn event(
        id: impl Into<String>,
        title: impl Into<String>,
        source_id: impl Into<String>,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_id: source_id.into(),
            kind: SourceKind::Event,
            due_at: None,
            start_at: Some(start_at),
            end_at: Some(end_at),
            is_completed: false,
            completed_at: None,
            has_recurrence: false,
            priority: 0,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "item.id")?;
        validate_non_empty(&self.source_id, "item.source_id")?;
        if self.is_completed != self.completed_at.is_some() {
            return Err("item.is_completed and item.completed_at must agree".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_at, self.end_at) {
            if end < start {
                return Err("item.end_at must be >= item.start_at".to_string());
            }
        }
        Ok(())
    }

    pub fn relevant_instant(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            SourceKind::Task => self.due_at,
            SourceKind::Event => self.start_at,
        }
    }

    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.is_completed = completed;
        self.completed_at = if completed { Some(now) } else { None };
    }

    /// Due before the local start of today; a task due later today is not overdue yet.
    pub fn is_overdue(&self, selector: &WindowSelector, now: DateTime<Utc>) -> bool {
        let today_start = selector.start_of_day(selector.local_date(now));
        !self.is_completed && self.due_at.is_some_and(|due| due < today_start)
    }

    pub fn has_notes(&self) -> bool {
        self.notes.as_deref().is_some_and(|notes| !notes.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub source_id: String,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_priority: bool,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        validate_non_empty(&self.source_id, "task.source_id")?;
        Ok(())
    }

    pub fn into_item(self, id: impl Into<String>) -> Item {
        let notes = self.notes.filter(|notes| !notes.trim().is_empty());
        let mut item = Item::task(id, self.title.trim(), self.source_id, self.due_at);
        item.notes = notes;
        item.priority = i32::from(self.is_priority);
        item
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
