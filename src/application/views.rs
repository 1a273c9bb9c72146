use crate::application::badge::BadgeCounter;
use crate::application::completion::{CompletionToggler, ToggleOutcome};
use crate::application::next_id;
use crate::application::preferences::Preferences;
use crate::application::source_fetch::{RetryPolicy, SkippedSource, SourceFetcher};
use crate::application::NowProvider;
use crate::domain::completion::DEFAULT_COMPLETION_DELAY;
use crate::domain::manual_order::{item_ids, project, reorder};
use crate::domain::merge::{merge, AgendaSections};
use crate::domain::models::{Item, NewTask, Source, SourceKind};
use crate::domain::visibility::visible_sources;
use crate::domain::window::{WindowKind, WindowSelector};
use crate::infrastructure::badge_sink::BadgeSink;
use crate::infrastructure::config::{AppConfig, FetchFailurePolicy};
use crate::infrastructure::error::AgendaError;
use crate::infrastructure::item_provider::ItemProvider;
use crate::infrastructure::settings_store::SettingsStore;
use crate::infrastructure::timer::DeferralTimer;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const NEXT_SCOPE: &str = "next";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Today,
    Day(NaiveDate),
    Week(NaiveDate),
    Next,
    AllOutstanding,
    Completed,
    Source(String),
}

impl ViewKind {
    fn window_kind(&self) -> WindowKind {
        match self {
            Self::Today | Self::Next => WindowKind::Today,
            Self::Day(date) => WindowKind::SingleDay(*date),
            Self::Week(date) => WindowKind::Week(*date),
            Self::AllOutstanding | Self::Source(_) => WindowKind::UnboundedFuture,
            Self::Completed => WindowKind::CompletedOnly,
        }
    }

    fn includes_events(&self) -> bool {
        matches!(self, Self::Day(_) | Self::Week(_))
    }

    pub fn manual_order_scope(&self) -> Option<&'static str> {
        match self {
            Self::Next => Some(NEXT_SCOPE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub view: ViewKind,
    pub events: Vec<Item>,
    pub tasks: Vec<Item>,
    pub skipped_sources: Vec<SkippedSource>,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceVisibility {
    pub source: Source,
    pub hidden: bool,
}

#[derive(Clone)]
pub struct AgendaOptions {
    pub window_selector: WindowSelector,
    pub fetch_failure_policy: FetchFailurePolicy,
    pub retry_policy: RetryPolicy,
    pub completion_delay: Duration,
    pub now_provider: NowProvider,
}

impl Default for AgendaOptions {
    fn default() -> Self {
        Self {
            window_selector: WindowSelector::default(),
            fetch_failure_policy: FetchFailurePolicy::AbortAll,
            retry_policy: RetryPolicy::default(),
            completion_delay: DEFAULT_COMPLETION_DELAY,
            now_provider: Arc::new(Utc::now),
        }
    }
}

impl AgendaOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self, AgendaError> {
        config.validate()?;
        Ok(Self {
            window_selector: WindowSelector::new(config.timezone()?),
            fetch_failure_policy: config.fetch_failure_policy,
            retry_policy: RetryPolicy::from(&config.retry),
            completion_delay: config.completion_delay(),
            now_provider: Arc::new(Utc::now),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }
}

pub struct AgendaService<P, S, B, T>
where
    P: ItemProvider + 'static,
    S: SettingsStore,
    B: BadgeSink,
    T: DeferralTimer,
{
    provider: Arc<P>,
    preferences: Preferences<S>,
    fetcher: Arc<SourceFetcher<P>>,
    badge: BadgeCounter<P, B>,
    toggler: CompletionToggler<P, T>,
    window_selector: WindowSelector,
    now_provider: NowProvider,
    snapshots: Mutex<HashMap<ViewKind, ViewSnapshot>>,
}

impl<P, S, B, T> AgendaService<P, S, B, T>
where
    P: ItemProvider + 'static,
    S: SettingsStore,
    B: BadgeSink,
    T: DeferralTimer,
{
    pub fn new(
        provider: Arc<P>,
        settings: Arc<S>,
        badge_sink: Arc<B>,
        timer: Arc<T>,
        options: AgendaOptions,
    ) -> Self {
        let fetcher = Arc::new(
            SourceFetcher::new(Arc::clone(&provider))
                .with_failure_policy(options.fetch_failure_policy)
                .with_retry_policy(options.retry_policy.clone()),
        );
        let badge = BadgeCounter::new(Arc::clone(&fetcher), badge_sink)
            .with_window_selector(options.window_selector)
            .with_now_provider(Arc::clone(&options.now_provider));
        let toggler = CompletionToggler::new(Arc::clone(&provider), timer)
            .with_delay(options.completion_delay)
            .with_now_provider(Arc::clone(&options.now_provider));

        Self {
            provider,
            preferences: Preferences::new(settings),
            fetcher,
            badge,
            toggler,
            window_selector: options.window_selector,
            now_provider: options.now_provider,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn preferences(&self) -> &Preferences<S> {
        &self.preferences
    }

    pub async fn visible_sources(&self, kind: SourceKind) -> Result<Vec<Source>, AgendaError> {
        let sources = self.provider.list_sources(kind).await?;
        let hidden = self.preferences.hidden_sources(kind);
        let mut visible = visible_sources(&sources, &hidden);
        visible.sort_by(|left, right| left.title.cmp(&right.title));
        Ok(visible)
    }

    pub async fn source_visibility(
        &self,
        kind: SourceKind,
    ) -> Result<Vec<SourceVisibility>, AgendaError> {
        let mut sources = self.provider.list_sources(kind).await?;
        sources.sort_by(|left, right| left.title.cmp(&right.title));
        let hidden = self.preferences.hidden_sources(kind);
        Ok(sources
            .into_iter()
            .map(|source| SourceVisibility {
                hidden: hidden.contains(&source.id),
                source,
            })
            .collect())
    }

    pub async fn set_source_hidden(
        &self,
        kind: SourceKind,
        source_id: &str,
        hidden: bool,
    ) -> Result<bool, AgendaError> {
        let changed = self.preferences.set_source_hidden(kind, source_id, hidden)?;
        if changed && kind == SourceKind::Task {
            self.recompute_badge_logged().await;
        }
        Ok(changed)
    }

    /// Refreshes `view`. On failure the previous snapshot is kept and marked stale.
    pub async fn fetch_view(&self, view: &ViewKind) -> Result<ViewSnapshot, AgendaError> {
        match self.load_view(view).await {
            Ok(snapshot) => {
                let mut snapshots = self.lock_snapshots()?;
                snapshots.insert(view.clone(), snapshot.clone());
                Ok(snapshot)
            }
            Err(error) => {
                log::warn!("failed to refresh view {view:?}, keeping last snapshot: {error}");
                if let Ok(mut snapshots) = self.snapshots.lock() {
                    if let Some(snapshot) = snapshots.get_mut(view) {
                        snapshot.stale = true;
                    }
                }
                Err(error)
            }
        }
    }

    pub fn snapshot(&self, view: &ViewKind) -> Option<ViewSnapshot> {
        self.snapshots
            .lock()
            .ok()
            .and_then(|snapshots| snapshots.get(view).cloned())
    }

    pub fn is_completing(&self, item_id: &str) -> bool {
        self.toggler.is_completing(item_id)
    }

    pub fn is_overdue(&self, item: &Item) -> bool {
        item.is_overdue(&self.window_selector, (self.now_provider)())
    }

    pub fn cancel_completion(&self, item_id: &str) -> bool {
        self.toggler.cancel(item_id)
    }

    pub async fn toggle(&self, view: &ViewKind, item_id: &str) -> Result<ToggleOutcome, AgendaError> {
        let item = self.shown_item(view, item_id)?;
        let outcome = self
            .toggler
            .toggle_then(&item, |committed| async move {
                if let Err(error) = self.apply_to_snapshots(&committed) {
                    log::warn!("failed to patch snapshots for {}: {error}", committed.id);
                }
                if let Err(error) = self.fetch_view(view).await {
                    log::warn!("refresh after toggling {} failed: {error}", committed.id);
                }
                self.recompute_badge_logged().await;
            })
            .await?;

        if let ToggleOutcome::PersistFailed { item, .. } = &outcome {
            self.apply_to_snapshots(item)?;
        }
        Ok(outcome)
    }

    pub fn reorder(&self, view: &ViewKind, from: usize, to: usize) -> Result<Vec<Item>, AgendaError> {
        let Some(scope) = view.manual_order_scope() else {
            return Err(AgendaError::InvalidInput(format!(
                "view {view:?} has no manual order"
            )));
        };
        let Some(displayed) = self.snapshot(view).map(|snapshot| snapshot.tasks) else {
            return Err(AgendaError::InvalidInput(format!(
                "view {view:?} must be fetched before reordering"
            )));
        };

        let next_order = reorder(&item_ids(&displayed), from, to).map_err(AgendaError::InvalidInput)?;
        self.preferences.replace_manual_order(scope, &next_order)?;

        let reordered = project(&displayed, &next_order);
        let mut snapshots = self.lock_snapshots()?;
        if let Some(snapshot) = snapshots.get_mut(view) {
            snapshot.tasks = reordered.clone();
        }
        Ok(reordered)
    }

    pub async fn create_task(&self, draft: NewTask) -> Result<Item, AgendaError> {
        draft.validate().map_err(AgendaError::InvalidInput)?;
        let sources = self.provider.list_sources(SourceKind::Task).await?;
        let source_known = sources
            .iter()
            .any(|source| source.id == draft.source_id && source.is_mutable());
        if !source_known {
            return Err(AgendaError::InvalidInput(format!(
                "unknown task source {}",
                draft.source_id
            )));
        }

        let item = draft.into_item(next_id("task"));
        self.provider.save(&item).await?;
        log::info!("created task {} in {}", item.id, item.source_id);
        self.recompute_badge_logged().await;
        Ok(item)
    }

    pub async fn recompute_badge(&self) -> Result<u32, AgendaError> {
        let hidden = self.preferences.hidden_sources(SourceKind::Task);
        if !self.preferences.badge_enabled() {
            return self.badge.recompute(&[], &hidden, false).await;
        }
        let sources = self.provider.list_sources(SourceKind::Task).await?;
        self.badge.recompute(&sources, &hidden, true).await
    }

    pub async fn set_badge_enabled(&self, enabled: bool) -> Result<u32, AgendaError> {
        self.preferences.set_badge_enabled(enabled)?;
        self.recompute_badge().await
    }

    async fn recompute_badge_logged(&self) {
        if let Err(error) = self.recompute_badge().await {
            log::warn!("badge recompute failed: {error}");
        }
    }

    async fn load_view(&self, view: &ViewKind) -> Result<ViewSnapshot, AgendaError> {
        let now = (self.now_provider)();
        let window = self.window_selector.resolve(view.window_kind(), now);
        let task_sources = match view {
            ViewKind::Source(source_id) => vec![self.task_source(source_id).await?],
            _ => self.visible_sources(SourceKind::Task).await?,
        };

        let task_outcome = self.fetcher.fetch(&task_sources, &window).await?;
        let mut skipped_sources = task_outcome.skipped;

        let (events, mut tasks) = if view.includes_events() {
            let event_sources = self.visible_sources(SourceKind::Event).await?;
            let event_outcome = self.fetcher.fetch(&event_sources, &window).await?;
            skipped_sources.extend(event_outcome.skipped);
            let sections =
                AgendaSections::build(event_outcome.per_source, task_outcome.per_source, &window);
            (sections.events, sections.tasks)
        } else {
            let tasks = merge(task_outcome.per_source, &window, is_task);
            (Vec::new(), tasks)
        };

        if let Some(scope) = view.manual_order_scope() {
            tasks = project(&tasks, &self.preferences.manual_order(scope));
        }

        Ok(ViewSnapshot {
            view: view.clone(),
            events,
            tasks,
            skipped_sources,
            fetched_at: now,
            stale: false,
        })
    }

    async fn task_source(&self, source_id: &str) -> Result<Source, AgendaError> {
        self.provider
            .list_sources(SourceKind::Task)
            .await?
            .into_iter()
            .find(|source| source.id == source_id)
            .ok_or_else(|| AgendaError::InvalidInput(format!("unknown task source {source_id}")))
    }

    fn shown_item(&self, view: &ViewKind, item_id: &str) -> Result<Item, AgendaError> {
        let snapshots = self.lock_snapshots()?;
        snapshots
            .get(view)
            .and_then(|snapshot| snapshot.tasks.iter().find(|item| item.id == item_id))
            .cloned()
            .ok_or_else(|| {
                AgendaError::InvalidInput(format!("item {item_id} is not shown in {view:?}"))
            })
    }

    fn apply_to_snapshots(&self, updated: &Item) -> Result<(), AgendaError> {
        let mut snapshots = self.lock_snapshots()?;
        for snapshot in snapshots.values_mut() {
            for item in snapshot.tasks.iter_mut().filter(|item| item.id == updated.id) {
                *item = updated.clone();
            }
        }
        Ok(())
    }

    fn lock_snapshots(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ViewKind, ViewSnapshot>>, AgendaError> {
        self.snapshots
            .lock()
            .map_err(|error| AgendaError::poisoned("view snapshots", error))
    }
}

fn is_task(item: &Item) -> bool {
    item.kind == SourceKind::Task
}
