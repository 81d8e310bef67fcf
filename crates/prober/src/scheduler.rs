//! Fixed-cadence trigger with a single-flight guard.
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub started: u64,
    pub skipped: u64,
}

pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Starts `job` on every tick, the first one immediately. A tick that
    /// fires while the previous job is still running is skipped. When
    /// `shutdown` resolves, any running job is aborted and the loop returns.
    pub async fn run<F, Fut, S>(&self, mut job: F, shutdown: S) -> SchedulerStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        S: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut in_flight: Option<JoinHandle<()>> = None;
        let mut stats = SchedulerStats::default();
        info!(period_secs = self.period.as_secs(), "Scheduler started.");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Termination signal received, stopping scheduler.");
                    if let Some(handle) = in_flight.take() {
                        if !handle.is_finished() {
                            warn!("Aborting in-flight probe cycle.");
                            handle.abort();
                        }
                    }
                    break;
                }

                _ = ticker.tick() => {
                    if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
                        warn!("Previous probe cycle still running; skipping this tick.");
                        stats.skipped += 1;
                        continue;
                    }
                    stats.started += 1;
                    info!(cycle = stats.started, "Starting probe cycle.");
                    in_flight = Some(tokio::spawn(job()));
                }
            }
        }

        stats
    }
}
