use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Default gap between two bucket listings
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// One unit of periodic work.
#[async_trait]
pub trait PollTask: Send + Sync + 'static {
    async fn run_cycle(&self);
}

/// Runs a [`PollTask`] on a fixed interval until stopped or cancelled.
///
/// Cycles never overlap: the next tick is only awaited once the current
/// cycle returned, and missed ticks are delayed rather than bunched up.
pub struct PollScheduler {
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawns the loop. The first cycle runs immediately.
    pub fn start<T: PollTask>(task: Arc<T>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            tracing::info!("🔁 Poller started (every {:?})", period);
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        tracing::info!("🛑 Poller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        task.run_cycle().await;
                    }
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Runs exactly one cycle in the caller's task.
    pub async fn tick<T: PollTask + ?Sized>(task: &T) {
        task.run_cycle().await;
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Lets the in-flight cycle finish, then ends the loop.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!("Poller task failed: {}", e);
                }
            }
        }
    }

    /// Aborts the loop immediately, dropping any in-flight cycle.
    pub fn cancel(&mut self) {
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        cycles: AtomicUsize,
    }

    #[async_trait]
    impl PollTask for Counter {
        async fn run_cycle(&self) {
            self.cycles.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_tick_runs_one_cycle() {
        let counter = Counter::default();
        PollScheduler::tick(&counter).await;
        PollScheduler::tick(&counter).await;
        assert_eq!(counter.cycles.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_and_stop() {
        let counter = Arc::new(Counter::default());
        let mut scheduler = PollScheduler::start(counter.clone(), Duration::from_secs(5));

        // First tick fires immediately, then one per period.
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(counter.cycles.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_running());

        scheduler.stop().await;
        assert!(!scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.cycles.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticking() {
        let counter = Arc::new(Counter::default());
        let mut scheduler = PollScheduler::start(counter.clone(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.cancel();
        let seen = counter.cycles.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.cycles.load(Ordering::SeqCst), seen);
        assert!(!scheduler.is_running());
    }
}
