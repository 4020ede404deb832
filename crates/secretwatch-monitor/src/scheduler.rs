//! Fixed-interval scheduler for the expiration job.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::{ExpirationJob, MonitorConfig};

/// Drives [`ExpirationJob::run`] on a fixed interval.
///
/// Runs never overlap: the next tick is only awaited once the current run
/// has returned. Ticks missed while a run was in progress are skipped.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    run_on_startup: bool,
}

impl Scheduler {
    #[must_use]
    pub fn new(interval: Duration, run_on_startup: bool) -> Self {
        Self {
            interval,
            run_on_startup,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.scan_interval, config.run_on_startup)
    }

    /// Runs until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A run that is already in progress when shutdown is requested finishes
    /// first. Returns the number of runs executed.
    pub async fn run(&self, job: &ExpirationJob, mut shutdown: watch::Receiver<bool>) -> usize {
        let first_tick = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            run_on_startup = self.run_on_startup,
            "Expiration scheduler started"
        );

        let mut runs = 0usize;
        let mut failed = 0usize;
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !job.run().await.is_completed() {
                        failed += 1;
                    }
                    runs += 1;
                }
            }
        }

        info!(runs, failed, "Expiration scheduler stopped");
        runs
    }
}
