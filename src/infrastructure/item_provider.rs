use crate::domain::models::{Item, Source, SourceKind};
use crate::domain::window::Window;
use crate::infrastructure::error::AgendaError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[async_trait]
pub trait ItemProvider: Send + Sync {
    async fn list_sources(&self, kind: SourceKind) -> Result<Vec<Source>, AgendaError>;

    /// Providers may return more than `window` admits; callers filter again.
    async fn query(&self, source: &Source, window: &Window) -> Result<Vec<Item>, AgendaError>;

    async fn save(&self, item: &Item) -> Result<(), AgendaError>;
}

#[derive(Debug)]
pub struct InMemoryItemProvider {
    sources: Mutex<Vec<Source>>,
    items: Mutex<Vec<Item>>,
    access_granted: AtomicBool,
}

impl Default for InMemoryItemProvider {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl InMemoryItemProvider {
    pub fn new(sources: Vec<Source>, items: Vec<Item>) -> Self {
        Self {
            sources: Mutex::new(sources),
            items: Mutex::new(items),
            access_granted: AtomicBool::new(true),
        }
    }

    pub fn set_access_granted(&self, granted: bool) {
        self.access_granted.store(granted, Ordering::SeqCst);
    }

    pub fn items(&self) -> Result<Vec<Item>, AgendaError> {
        let items = self
            .items
            .lock()
            .map_err(|error| AgendaError::poisoned("item provider", error))?;
        Ok(items.clone())
    }

    pub fn item(&self, item_id: &str) -> Result<Option<Item>, AgendaError> {
        Ok(self.items()?.into_iter().find(|item| item.id == item_id))
    }

    fn ensure_access(&self) -> Result<(), AgendaError> {
        if self.access_granted.load(Ordering::SeqCst) {
            return Ok(());
        }
        Err(AgendaError::ProviderUnavailable(
            "access to items has not been granted".to_string(),
        ))
    }

    fn source(&self, source_id: &str) -> Result<Option<Source>, AgendaError> {
        let sources = self
            .sources
            .lock()
            .map_err(|error| AgendaError::poisoned("item provider", error))?;
        Ok(sources.iter().find(|source| source.id == source_id).cloned())
    }
}

#[async_trait]
impl ItemProvider for InMemoryItemProvider {
    async fn list_sources(&self, kind: SourceKind) -> Result<Vec<Source>, AgendaError> {
        self.ensure_access()?;
        let sources = self
            .sources
            .lock()
            .map_err(|error| AgendaError::poisoned("item provider", error))?;
        Ok(sources
            .iter()
            .filter(|source| source.kind == kind)
            .cloned()
            .collect())
    }

    async fn query(&self, source: &Source, _window: &Window) -> Result<Vec<Item>, AgendaError> {
        self.ensure_access()?;
        let items = self
            .items
            .lock()
            .map_err(|error| AgendaError::poisoned("item provider", error))?;
        Ok(items
            .iter()
            .filter(|item| item.source_id == source.id)
            .cloned()
            .collect())
    }

    async fn save(&self, item: &Item) -> Result<(), AgendaError> {
        self.ensure_access()?;
        let persist_error = |message: &str| AgendaError::PersistFailure {
            item_id: item.id.clone(),
            message: message.to_string(),
        };
        let Some(source) = self.source(&item.source_id)? else {
            return Err(persist_error("unknown source"));
        };
        if !source.is_mutable() {
            return Err(persist_error("source is read-only"));
        }
        item.validate().map_err(|message| persist_error(&message))?;

        let mut items = self
            .items
            .lock()
            .map_err(|error| AgendaError::poisoned("item provider", error))?;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, kind: SourceKind) -> Source {
        Source {
            id: id.to_string(),
            title: id.to_string(),
            color: "#000000".to_string(),
            kind,
        }
    }

    fn provider() -> InMemoryItemProvider {
        let now = chrono::Utc::now();
        InMemoryItemProvider::new(
            vec![source("list", SourceKind::Task), source("cal", SourceKind::Event)],
            vec![
                Item::task("t1", "Task", "list", None),
                Item::event("e1", "Event", "cal", now, now),
            ],
        )
    }

    #[tokio::test]
    async fn lists_sources_by_kind_and_queries_per_source() {
        let provider = provider();
        let task_sources = provider.list_sources(SourceKind::Task).await.expect("list sources");
        assert_eq!(task_sources.len(), 1);

        let items = provider
            .query(&task_sources[0], &Window::unbounded())
            .await
            .expect("query");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "t1");
    }

    #[tokio::test]
    async fn save_updates_task_and_rejects_events() {
        let provider = provider();
        let mut task = provider.item("t1").expect("read").expect("task exists");
        task.set_completed(true, chrono::Utc::now());
        provider.save(&task).await.expect("save task");
        assert!(provider.item("t1").expect("read").expect("task exists").is_completed);

        let event = provider.item("e1").expect("read").expect("event exists");
        assert!(matches!(
            provider.save(&event).await,
            Err(AgendaError::PersistFailure { .. })
        ));
    }

    #[tokio::test]
    async fn revoked_access_makes_provider_unavailable() {
        let provider = provider();
        provider.set_access_granted(false);
        assert!(matches!(
            provider.list_sources(SourceKind::Task).await,
            Err(AgendaError::ProviderUnavailable(_))
        ));
    }
}
