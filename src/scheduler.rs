// src/scheduler.rs
//! Fixed-interval trigger for the aggregation job.
//!
//! At most one scheduled execution is in flight. A tick that fires while the
//! previous execution is still running is dropped, and the next tick stays on
//! the original schedule (start + k * interval).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Work the trigger invokes on every tick.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    async fn execute(&self);
}

/// Read-only view of a scheduled job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobInfo {
    pub id: String,
    pub name: String,
    pub next_run_time: Option<DateTime<Utc>>,
    pub trigger: String,
}

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

enum State {
    Stopped,
    Running(Running),
    /// Shutdown signalled; the in-flight run is still draining.
    Stopping,
}

/// Owned periodic trigger: `Stopped -> Running -> Stopping -> Stopped`.
pub struct Trigger {
    job: Arc<dyn ScheduledJob>,
    interval: Duration,
    in_flight: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    next_fire: Arc<Mutex<Option<DateTime<Utc>>>>,
    state: Mutex<State>,
}

impl Trigger {
    pub fn new(job: Arc<dyn ScheduledJob>, interval: Duration) -> Self {
        Self {
            job,
            interval,
            in_flight: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            next_fire: Arc::new(Mutex::new(None)),
            state: Mutex::new(State::Stopped),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }

    /// Start ticking; the first execution fires one interval from now.
    /// Returns `false` (and warns) if not stopped, or if the interval does not
    /// fit on the clock.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if !matches!(*state, State::Stopped) {
            tracing::warn!(target: "scheduler", "scheduler is already running");
            return false;
        }
        let Some(first_fire) = Instant::now().checked_add(self.interval) else {
            tracing::error!(
                target: "scheduler",
                interval_secs = self.interval.as_secs(),
                "interval overflows the clock, scheduler not started"
            );
            return false;
        };

        let (tx, rx) = watch::channel(false);
        set_next_fire(&self.next_fire, self.interval);
        let handle = tokio::spawn(drive(
            Arc::clone(&self.job),
            first_fire,
            self.interval,
            Arc::clone(&self.in_flight),
            Arc::clone(&self.dropped),
            Arc::clone(&self.next_fire),
            rx,
        ));
        *state = State::Running(Running {
            shutdown: tx,
            handle,
        });

        tracing::info!(
            target: "scheduler",
            job = self.job.id(),
            trigger = %describe_interval(self.interval),
            "scheduler started"
        );
        true
    }

    /// Stop ticking and wait for an in-flight execution to finish. The trigger
    /// reports running until the drain completes.
    /// Returns `false` (and warns) if not running.
    pub async fn stop(&self) -> bool {
        let running = {
            let mut state = self.state();
            match std::mem::replace(&mut *state, State::Stopping) {
                State::Running(r) => r,
                other => {
                    *state = other;
                    tracing::warn!(target: "scheduler", "scheduler is not running");
                    return false;
                }
            }
        };

        let _ = running.shutdown.send(true);
        clear_next_fire(&self.next_fire);
        if let Err(e) = running.handle.await {
            tracing::error!(target: "scheduler", error = %e, "scheduler task ended abnormally");
        }
        clear_next_fire(&self.next_fire);
        *self.state() = State::Stopped;
        tracing::info!(target: "scheduler", "scheduler stopped");
        true
    }

    /// True from `start` until `stop` has drained the in-flight run.
    pub fn is_running(&self) -> bool {
        !matches!(*self.state(), State::Stopped)
    }

    /// Whether a scheduled execution is currently in flight.
    pub fn is_executing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Ticks dropped because the previous execution was still running.
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Scheduled jobs; empty while stopped. `next_run_time` is null while draining.
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        if !self.is_running() {
            return Vec::new();
        }
        let next_run_time = match self.next_fire.lock() {
            Ok(g) => *g,
            Err(p) => *p.into_inner(),
        };
        vec![JobInfo {
            id: self.job.id().to_string(),
            name: self.job.name().to_string(),
            next_run_time,
            trigger: describe_interval(self.interval),
        }]
    }
}

/// Resets the in-flight flag even if the job panics.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn drive(
    job: Arc<dyn ScheduledJob>,
    first_fire: Instant,
    period: Duration,
    in_flight: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    next_fire: Arc<Mutex<Option<DateTime<Utc>>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(first_fire, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut current: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                set_next_fire(&next_fire, period);
                if in_flight
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    counter!("scheduler_ticks_dropped_total").increment(1);
                    tracing::warn!(
                        target: "scheduler",
                        job = job.id(),
                        "previous run still in flight, tick dropped"
                    );
                    continue;
                }

                let guard = InFlightGuard(Arc::clone(&in_flight));
                let job = Arc::clone(&job);
                current = Some(tokio::spawn(async move {
                    let _guard = guard;
                    job.execute().await;
                }));
            }
        }
    }

    // Graceful drain: never abandon a run mid-way.
    if let Some(handle) = current.take() {
        if !handle.is_finished() {
            tracing::info!(target: "scheduler", "waiting for in-flight run to finish");
        }
        if let Err(e) = handle.await {
            tracing::error!(target: "scheduler", error = %e, "scheduled run panicked");
        }
    }
}

fn set_next_fire(slot: &Mutex<Option<DateTime<Utc>>>, period: Duration) {
    let next = chrono::Duration::from_std(period)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d));
    match slot.lock() {
        Ok(mut g) => *g = next,
        Err(p) => *p.into_inner() = next,
    }
}

fn clear_next_fire(slot: &Mutex<Option<DateTime<Utc>>>) {
    match slot.lock() {
        Ok(mut g) => *g = None,
        Err(p) => *p.into_inner() = None,
    }
}

/// Render like `interval[8:00:00]`.
pub fn describe_interval(period: Duration) -> String {
    let secs = period.as_secs();
    format!(
        "interval[{}:{:02}:{:02}]",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_description_matches_hms() {
        assert_eq!(describe_interval(Duration::from_secs(8 * 3600)), "interval[8:00:00]");
        assert_eq!(describe_interval(Duration::from_secs(90)), "interval[0:01:30]");
        assert_eq!(describe_interval(Duration::from_secs(30 * 3600 + 5)), "interval[30:00:05]");
    }
}
