use crate::application::source_fetch::SourceFetcher;
use crate::application::NowProvider;
use crate::domain::merge::merge;
use crate::domain::models::{Source, SourceKind};
use crate::domain::visibility::{visible_sources, HiddenSet};
use crate::domain::window::{WindowKind, WindowSelector};
use crate::infrastructure::badge_sink::BadgeSink;
use crate::infrastructure::error::AgendaError;
use crate::infrastructure::item_provider::ItemProvider;
use chrono::Utc;
use std::sync::Arc;

pub struct BadgeCounter<P, B>
where
    P: ItemProvider + 'static,
    B: BadgeSink,
{
    fetcher: Arc<SourceFetcher<P>>,
    sink: Arc<B>,
    window_selector: WindowSelector,
    now_provider: NowProvider,
}

impl<P, B> BadgeCounter<P, B>
where
    P: ItemProvider + 'static,
    B: BadgeSink,
{
    pub fn new(fetcher: Arc<SourceFetcher<P>>, sink: Arc<B>) -> Self {
        Self {
            fetcher,
            sink,
            window_selector: WindowSelector::default(),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_window_selector(mut self, window_selector: WindowSelector) -> Self {
        self.window_selector = window_selector;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn recompute(
        &self,
        sources: &[Source],
        hidden: &HiddenSet,
        enabled: bool,
    ) -> Result<u32, AgendaError> {
        if !enabled {
            self.emit(0).await;
            return Ok(0);
        }

        let task_sources: Vec<Source> = visible_sources(sources, hidden)
            .into_iter()
            .filter(|source| source.kind == SourceKind::Task)
            .collect();
        let window = self
            .window_selector
            .resolve(WindowKind::Today, (self.now_provider)());
        let outcome = self.fetcher.fetch(&task_sources, &window).await?;
        let outstanding = merge(outcome.per_source, &window, |item| {
            item.kind == SourceKind::Task
        });

        let count = u32::try_from(outstanding.len()).unwrap_or(u32::MAX);
        self.emit(count).await;
        Ok(count)
    }

    async fn emit(&self, count: u32) {
        if let Err(error) = self.sink.set_badge_count(count).await {
            log::warn!("failed to set badge count {count}: {error}");
        }
    }
}
