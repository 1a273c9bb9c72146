use crate::application::NowProvider;
use crate::domain::completion::{CompletionGuard, TogglePlan};
use crate::domain::models::Item;
use crate::infrastructure::error::AgendaError;
use crate::infrastructure::item_provider::ItemProvider;
use crate::infrastructure::timer::DeferralTimer;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug)]
pub enum ToggleOutcome {
    Ignored,
    Cancelled,
    Committed(Item),
    /// The toggled item is kept as-is; `error` is always a `PersistFailure`.
    PersistFailed { item: Item, error: AgendaError },
}

impl ToggleOutcome {
    pub fn item(&self) -> Option<&Item> {
        match self {
            Self::Committed(item) | Self::PersistFailed { item, .. } => Some(item),
            Self::Ignored | Self::Cancelled => None,
        }
    }
}

pub struct CompletionToggler<P, T>
where
    P: ItemProvider,
    T: DeferralTimer,
{
    provider: Arc<P>,
    timer: Arc<T>,
    guard: Mutex<CompletionGuard>,
    pending: Mutex<HashMap<String, Arc<Notify>>>,
    now_provider: NowProvider,
}

impl<P, T> CompletionToggler<P, T>
where
    P: ItemProvider,
    T: DeferralTimer,
{
    pub fn new(provider: Arc<P>, timer: Arc<T>) -> Self {
        Self {
            provider,
            timer,
            guard: Mutex::new(CompletionGuard::default()),
            pending: Mutex::new(HashMap::new()),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.guard = Mutex::new(CompletionGuard::new(delay));
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn is_completing(&self, item_id: &str) -> bool {
        self.guard
            .lock()
            .map(|guard| guard.is_completing(item_id))
            .unwrap_or(false)
    }

    pub async fn toggle(&self, item: &Item) -> Result<ToggleOutcome, AgendaError> {
        self.toggle_then(item, |_| async {}).await
    }

    /// Like [`toggle`](Self::toggle), but runs `after_commit` on a committed
    /// item before the item leaves the completing state.
    pub async fn toggle_then<F, Fut>(
        &self,
        item: &Item,
        after_commit: F,
    ) -> Result<ToggleOutcome, AgendaError>
    where
        F: FnOnce(Item) -> Fut,
        Fut: Future<Output = ()>,
    {
        let plan = {
            let mut guard = self
                .guard
                .lock()
                .map_err(|error| AgendaError::poisoned("completion guard", error))?;
            guard.plan(item).map_err(AgendaError::InvalidInput)?
        };

        match plan {
            TogglePlan::Ignore => {
                log::debug!("ignoring toggle for {} while it is completing", item.id);
                Ok(ToggleOutcome::Ignored)
            }
            TogglePlan::UncompleteNow => {
                let outcome = self.commit(item, false).await;
                if let ToggleOutcome::Committed(committed) = &outcome {
                    after_commit(committed.clone()).await;
                }
                Ok(outcome)
            }
            TogglePlan::DeferComplete { delay } => {
                let _slot = CompletingSlot {
                    guard: &self.guard,
                    pending: &self.pending,
                    item_id: item.id.clone(),
                };
                let cancel = Arc::new(Notify::new());
                self.pending
                    .lock()
                    .map_err(|error| AgendaError::poisoned("pending completions", error))?
                    .insert(item.id.clone(), Arc::clone(&cancel));

                tokio::select! {
                    _ = self.timer.sleep(delay) => {}
                    _ = cancel.notified() => {
                        log::debug!("deferred completion of {} cancelled", item.id);
                        return Ok(ToggleOutcome::Cancelled);
                    }
                }
                // Past the deferral a cancel can no longer stop the commit.
                if let Ok(mut pending) = self.pending.lock() {
                    pending.remove(&item.id);
                }

                let outcome = self.commit(item, true).await;
                if let ToggleOutcome::Committed(committed) = &outcome {
                    after_commit(committed.clone()).await;
                }
                Ok(outcome)
            }
        }
    }

    pub fn cancel(&self, item_id: &str) -> bool {
        let Ok(pending) = self.pending.lock() else {
            return false;
        };
        match pending.get(item_id) {
            Some(cancel) => {
                cancel.notify_one();
                true
            }
            None => false,
        }
    }

    async fn commit(&self, item: &Item, completed: bool) -> ToggleOutcome {
        let mut updated = item.clone();
        updated.set_completed(completed, (self.now_provider)());

        match self.provider.save(&updated).await {
            Ok(()) => ToggleOutcome::Committed(updated),
            Err(error) => {
                let error = match error {
                    error @ AgendaError::PersistFailure { .. } => error,
                    other => AgendaError::PersistFailure {
                        item_id: updated.id.clone(),
                        message: other.to_string(),
                    },
                };
                log::error!("failed to persist completion change: {error}");
                ToggleOutcome::PersistFailed {
                    item: updated,
                    error,
                }
            }
        }
    }
}

struct CompletingSlot<'a> {
    guard: &'a Mutex<CompletionGuard>,
    pending: &'a Mutex<HashMap<String, Arc<Notify>>>,
    item_id: String,
}

impl Drop for CompletingSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.item_id);
        }
        if let Ok(mut guard) = self.guard.lock() {
            guard.finish(&self.item_id);
        }
    }
}
