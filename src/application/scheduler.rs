use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::adapters::store::QuotaCache;

/// Drives independent periodic tasks, optionally gated on remaining quota
pub struct Scheduler {
    quota: Arc<QuotaCache>,
}

impl Scheduler {
    pub fn new(quota: Arc<QuotaCache>) -> Self {
        Self { quota }
    }

    /// Spawn a loop that runs `task` now and then once per `interval`.
    ///
    /// Invocations of one task never overlap. When `gated` is set, each
    /// invocation first waits for a known quota and is skipped while the
    /// quota is exhausted; the loop still waits out the full interval.
    pub fn schedule<F, Fut>(
        &self,
        name: &'static str,
        interval: Duration,
        gated: bool,
        task: F,
    ) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let quota = self.quota.clone();
        info!(task = name, ?interval, gated, "Scheduling task");

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if gated && !quota.is_quota_available().await {
                    debug!(task = name, "API quota exhausted, skipping");
                    continue;
                }

                task().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::QuotaSnapshot;

    const MINUTE: Duration = Duration::from_secs(60);

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send + Sync + 'static {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ungated_task_runs_every_interval() {
        let scheduler = Scheduler::new(Arc::new(QuotaCache::new()));
        let runs = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule("ungated", MINUTE, false, counting(&runs));
        time::sleep(MINUTE * 2 + MINUTE / 2).await;

        assert_eq!(runs.load(Ordering::SeqCst), 3);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gated_task_waits_for_first_quota() {
        let quota = Arc::new(QuotaCache::new());
        let scheduler = Scheduler::new(quota.clone());
        let runs = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule("gated", MINUTE, true, counting(&runs));
        time::sleep(MINUTE * 5).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        quota.set(QuotaSnapshot::new(1440.0, 100.0));
        time::sleep(Duration::from_secs(1)).await;
        assert!(runs.load(Ordering::SeqCst) >= 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gated_task_skips_while_exhausted() {
        let quota = Arc::new(QuotaCache::new());
        quota.set(QuotaSnapshot::new(1440.0, 0.0));
        let scheduler = Scheduler::new(quota.clone());
        let runs = Arc::new(AtomicUsize::new(0));

        let handle = scheduler.schedule("gated", MINUTE, true, counting(&runs));
        time::sleep(MINUTE * 3 + MINUTE / 2).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        quota.set(QuotaSnapshot::new(1440.0, 5.0));
        time::sleep(MINUTE).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        handle.abort();
    }
}
