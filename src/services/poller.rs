use crate::models::PollOutcome;
use crate::services::scheduler::PollTask;
use crate::services::storage::StorageService;
use crate::services::tracker::SessionTracker;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Poll cycle for the bucket: list, correlate, publish.
///
/// Subscribers always see the outcome of the last completed cycle. A failed
/// listing is logged and skipped; the next tick is the retry.
pub struct BucketPoller {
    storage: Arc<dyn StorageService>,
    tracker: Arc<SessionTracker>,
    outcomes: watch::Sender<Option<PollOutcome>>,
}

impl BucketPoller {
    pub fn new(storage: Arc<dyn StorageService>, tracker: Arc<SessionTracker>) -> Self {
        let (outcomes, _) = watch::channel(None);
        Self {
            storage,
            tracker,
            outcomes,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PollOutcome>> {
        self.outcomes.subscribe()
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }
}

#[async_trait]
impl PollTask for BucketPoller {
    async fn run_cycle(&self) {
        match self.tracker.poll(self.storage.as_ref()).await {
            Ok(outcome) => {
                tracing::debug!(
                    "Poll: {} related file(s), status {:?}",
                    outcome.related.len(),
                    outcome.status
                );
                self.outcomes.send_replace(Some(outcome));
            }
            Err(e) => {
                tracing::warn!("⚠️  {}", e);
            }
        }
    }
}
