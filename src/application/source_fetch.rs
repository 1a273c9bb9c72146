use crate::domain::models::{Item, Source};
use crate::domain::window::Window;
use crate::infrastructure::config::{FetchFailurePolicy, RetryConfig};
use crate::infrastructure::error::AgendaError;
use crate::infrastructure::item_provider::ItemProvider;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{sleep, Duration as TokioDuration};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSource {
    pub source_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub per_source: Vec<Vec<Item>>,
    pub skipped: Vec<SkippedSource>,
}

impl FetchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// `ProviderUnavailable` always fails the whole fetch; other per-source
/// errors follow the configured [`FetchFailurePolicy`].
pub struct SourceFetcher<P>
where
    P: ItemProvider + 'static,
{
    provider: Arc<P>,
    failure_policy: FetchFailurePolicy,
    retry_policy: RetryPolicy,
}

impl<P> SourceFetcher<P>
where
    P: ItemProvider + 'static,
{
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            failure_policy: FetchFailurePolicy::AbortAll,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FetchFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn failure_policy(&self) -> FetchFailurePolicy {
        self.failure_policy
    }

    pub async fn fetch(&self, sources: &[Source], window: &Window) -> Result<FetchOutcome, AgendaError> {
        let mut queries: JoinSet<(usize, Result<Vec<Item>, AgendaError>)> = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            let provider = Arc::clone(&self.provider);
            let retry_policy = self.retry_policy.clone();
            let source = source.clone();
            let window = *window;
            queries.spawn(async move {
                let result = query_with_retry(provider.as_ref(), &source, &window, &retry_policy).await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<Vec<Item>, AgendaError>>> =
            (0..sources.len()).map(|_| None).collect();
        while let Some(joined) = queries.join_next().await {
            let (index, result) = joined.map_err(|error| AgendaError::FetchFailure {
                source_id: "*".to_string(),
                message: format!("failed to join source query: {error}"),
            })?;
            if let Some(slot) = results.get_mut(index) {
                *slot = Some(result);
            }
        }

        let mut outcome = FetchOutcome::default();
        for (source, result) in sources.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                Err(AgendaError::FetchFailure {
                    source_id: source.id.clone(),
                    message: "query produced no result".to_string(),
                })
            });
            match result {
                Ok(items) => outcome.per_source.push(items),
                Err(error @ AgendaError::ProviderUnavailable(_)) => return Err(error),
                Err(error) => match self.failure_policy {
                    FetchFailurePolicy::AbortAll => {
                        return Err(AgendaError::FetchFailure {
                            source_id: source.id.clone(),
                            message: error.to_string(),
                        });
                    }
                    FetchFailurePolicy::SkipFailed => {
                        log::warn!("skipping source {} after failed query: {error}", source.id);
                        outcome.skipped.push(SkippedSource {
                            source_id: source.id.clone(),
                            message: error.to_string(),
                        });
                    }
                },
            }
        }
        Ok(outcome)
    }
}

async fn query_with_retry<P>(
    provider: &P,
    source: &Source,
    window: &Window,
    retry_policy: &RetryPolicy,
) -> Result<Vec<Item>, AgendaError>
where
    P: ItemProvider + ?Sized,
{
    let max_attempts = retry_policy.max_attempts.max(1);
    let mut attempt: u8 = 0;

    loop {
        match provider.query(source, window).await {
            Ok(items) => return Ok(items),
            Err(error) if error.is_transient() && attempt + 1 < max_attempts => {
                let delay = retry_policy
                    .base_delay_ms
                    .saturating_mul(2u64.saturating_pow(attempt as u32));
                log::debug!("retrying source {} in {delay}ms: {error}", source.id);
                sleep(TokioDuration::from_millis(delay)).await;
                attempt = attempt.saturating_add(1);
            }
            Err(error) => return Err(error),
        }
    }
}
