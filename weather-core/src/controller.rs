//! A small polling controller that drives the reconciler.
//!
//! Every known report is reconciled once per resync interval. A failed
//! attempt is retried after an exponential per-report backoff instead.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    client::WeatherSource,
    reconcile::{ReconcileError, Reconciler},
    resource::{ObjectKey, ReportStatus},
    store::{ReportStore, StoreError},
};

pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Deadlines past this horizon are clamped to it.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, clamped so that oversized delays cannot overflow.
fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay.min(FAR_FUTURE)).unwrap_or(now)
}

/// Per-report exponential backoff: `min * 2^(failures - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min: DEFAULT_BACKOFF_MIN,
            max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.min
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max)
    }
}

/// Outcome of one attempt for one report.
pub type Attempt = (ObjectKey, Result<ReportStatus, ReconcileError>);

#[derive(Debug, Clone, Copy)]
struct Schedule {
    failures: u32,
    next_run: Instant,
}

#[derive(Debug)]
pub struct Controller<W, S> {
    reconciler: Reconciler<W, S>,
    backoff: Backoff,
    resync_interval: Duration,
    queue: HashMap<ObjectKey, Schedule>,
}

impl<W: WeatherSource, S: ReportStore> Controller<W, S> {
    pub fn new(reconciler: Reconciler<W, S>, backoff: Backoff, resync_interval: Duration) -> Self {
        Self {
            reconciler,
            backoff,
            resync_interval,
            queue: HashMap::new(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<W, S> {
        &self.reconciler
    }

    /// Consecutive failures recorded for a report.
    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.queue.get(key).map_or(0, |s| s.failures)
    }

    pub fn next_run(&self, key: &ObjectKey) -> Option<Instant> {
        self.queue.get(key).map(|s| s.next_run)
    }

    /// Reconcile every stored report once, ignoring schedules.
    pub async fn run_once(&self) -> Result<Vec<Attempt>, StoreError> {
        let keys = self.reconciler.store().list().await?;

        let mut attempts = Vec::with_capacity(keys.len());
        for key in keys {
            let result = self.reconciler.reconcile(&key).await;
            attempts.push((key, result));
        }
        Ok(attempts)
    }

    /// Reconcile the reports that are due at `now` and reschedule them.
    ///
    /// Reports seen for the first time are due immediately. Reports that
    /// disappeared from the store are forgotten.
    pub async fn process_due(&mut self, now: Instant) -> Result<Vec<Attempt>, StoreError> {
        let keys = self.reconciler.store().list().await?;

        let live: HashSet<&ObjectKey> = keys.iter().collect();
        self.queue.retain(|key, _| live.contains(key));

        let mut attempts = Vec::new();
        for key in &keys {
            let schedule = self.queue.entry(key.clone()).or_insert(Schedule {
                failures: 0,
                next_run: now,
            });
            if schedule.next_run > now {
                continue;
            }

            let result = self.reconciler.reconcile(key).await;
            self.record(key, &result, now);
            attempts.push((key.clone(), result));
        }
        Ok(attempts)
    }

    fn record(
        &mut self,
        key: &ObjectKey,
        result: &Result<ReportStatus, ReconcileError>,
        now: Instant,
    ) {
        let Some(schedule) = self.queue.get_mut(key) else {
            return;
        };

        match result {
            Ok(_) => {
                schedule.failures = 0;
                schedule.next_run = deadline(now, self.resync_interval);
            }
            Err(err) => {
                schedule.failures = schedule.failures.saturating_add(1);
                let delay = self.backoff.delay(schedule.failures);
                schedule.next_run = deadline(now, delay);
                warn!(
                    %key,
                    failures = schedule.failures,
                    retry_in = ?delay,
                    transient = err.is_transient(),
                    error = %err,
                    "Reconcile failed, backing off"
                );
            }
        }
    }

    fn next_wake(&self, now: Instant) -> Instant {
        let resync = deadline(now, self.resync_interval);
        self.queue
            .values()
            .map(|s| s.next_run)
            .min()
            .map_or(resync, |next| next.min(resync))
            .max(now)
    }

    /// Reconcile until `shutdown` resolves. An attempt in progress is
    /// finished before the loop exits.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            resync_interval = ?self.resync_interval,
            backoff_min = ?self.backoff.min,
            backoff_max = ?self.backoff.max,
            "Starting controller"
        );

        loop {
            match self.process_due(Instant::now()).await {
                Ok(attempts) => debug!(attempts = attempts.len(), "Processed due reports"),
                Err(err) => error!(error = %err, "Failed to list reports"),
            }

            let wake = self.next_wake(Instant::now());
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down controller");
                    break;
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}
