//! PollingOrchestrator - Stable count poller
//!
//! ## Responsibilities
//!
//! - Fixed-rate tick schedule (first tick after a short start delay)
//! - At most one fetch + filter + persist sequence in flight; overlapping
//!   ticks are dropped, never queued
//! - Persist each stable change to the vehicle log
//! - Error streak bookkeeping with log suppression and recovery notice
//! - Cooperative stop: no new ticks, an in-flight tick runs to completion

use crate::error::Error;
use crate::error_streak_tracker::{ErrorStreakTracker, StreakEvent};
use crate::raw_source_client::{RawSource, RawSourceClient};
use crate::stability_filter::{FilterEvent, FilterState, StabilityFilter, DEFAULT_STABLE_THRESHOLD};
use crate::vehicle_log_service::{VehicleLogEntry, VehicleLogService};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Default tick period
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default delay before the first tick
pub const DEFAULT_START_DELAY_MS: u64 = 250;

/// Poller settings
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Tag written with every persisted entry
    pub camera_id: i64,
    /// Tick period (zero is raised to 1ms)
    pub interval: Duration,
    /// Identical samples required for stability (<= 0 treated as 1)
    pub stable_threshold: i64,
    /// Delay before the first tick
    pub start_delay: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            camera_id: 1,
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stable_threshold: DEFAULT_STABLE_THRESHOLD as i64,
            start_delay: Duration::from_millis(DEFAULT_START_DELAY_MS),
        }
    }
}

/// Poller counters (snapshot)
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollerStats {
    pub ticks: u64,
    pub ticks_dropped: u64,
    pub samples: u64,
    pub fetch_errors: u64,
    pub persist_errors: u64,
    pub stable_changes: u64,
    pub consecutive_errors: u64,
    pub last_raw_value: Option<i64>,
    pub last_stable_value: Option<i64>,
}

/// Result of one tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Another tick was in flight; nothing happened
    Dropped,
    /// Fetch, parse or persistence failed
    Failed(Error),
    /// Sample accepted, no stable change
    Sampled { raw: i64 },
    /// Stable change written
    Persisted(VehicleLogEntry),
}

/// State touched only by the tick holding the in-flight guard
struct TickState {
    filter: FilterState,
    errors: ErrorStreakTracker,
}

/// PollingOrchestrator instance
pub struct PollingOrchestrator<S = RawSourceClient> {
    source: S,
    store: Arc<VehicleLogService>,
    config: PollerConfig,
    filter: StabilityFilter,
    tick_state: Mutex<TickState>,
    stats: RwLock<PollerStats>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<S: RawSource> PollingOrchestrator<S> {
    /// Create new PollingOrchestrator
    pub fn new(source: S, store: Arc<VehicleLogService>, mut config: PollerConfig) -> Self {
        config.interval = config.interval.max(Duration::from_millis(1));
        let filter = StabilityFilter::new(config.stable_threshold);
        let (shutdown, _) = watch::channel(false);

        Self {
            source,
            store,
            config,
            filter,
            tick_state: Mutex::new(TickState {
                filter: FilterState::default(),
                errors: ErrorStreakTracker::new(),
            }),
            stats: RwLock::new(PollerStats::default()),
            shutdown,
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Counter snapshot
    pub async fn stats(&self) -> PollerStats {
        self.stats.read().await.clone()
    }

    /// Filter state; waits for an in-flight tick to finish
    pub async fn filter_state(&self) -> FilterState {
        self.tick_state.lock().await.filter
    }

    /// Whether a polling worker is alive (a stopped worker counts until it exits)
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Start polling loop
    ///
    /// No-op while a worker is running. After `stop`, waits for the previous
    /// worker to exit before starting a fresh one.
    pub async fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().await;

        if let Some(previous) = worker.take() {
            if !previous.is_finished() && !*self.shutdown.borrow() {
                tracing::warn!("Polling already running");
                *worker = Some(previous);
                return;
            }
            if let Err(e) = previous.await {
                tracing::error!(error = %e, "Previous polling task terminated abnormally");
            }
        }

        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!(
            camera_id = self.config.camera_id,
            interval_ms = self.config.interval.as_millis() as u64,
            stable_threshold = self.filter.threshold(),
            start_delay_ms = self.config.start_delay.as_millis() as u64,
            "Starting polling orchestrator"
        );

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let period = this.config.interval;
            let mut ticker = interval_at(Instant::now() + this.config.start_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                let started = Instant::now();
                this.tick().await;

                // timer fires that elapsed during this tick are skipped by the ticker
                let overrun = (started.elapsed().as_nanos() / period.as_nanos()) as u64;
                if overrun > 0 {
                    this.stats.write().await.ticks_dropped += overrun;
                    tracing::debug!(
                        camera_id = this.config.camera_id,
                        dropped = overrun,
                        "Tick overran interval, dropping missed ticks"
                    );
                }
            }

            tracing::info!(camera_id = this.config.camera_id, "Polling orchestrator stopped");
        });

        *worker = Some(handle);
    }

    /// Stop polling loop
    ///
    /// Idempotent and non-blocking. An in-flight tick is not cancelled.
    pub fn stop(&self) {
        let already_stopped = self.shutdown.send_replace(true);
        if !already_stopped {
            tracing::info!(camera_id = self.config.camera_id, "Stopping polling orchestrator");
        }
    }

    /// Wait for the polling loop to exit after `stop`
    pub async fn join(&self) {
        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Polling task terminated abnormally");
            }
        }
    }

    /// Run one fetch + filter + persist cycle
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut state) = self.tick_state.try_lock() else {
            self.stats.write().await.ticks_dropped += 1;
            tracing::debug!(
                camera_id = self.config.camera_id,
                "Tick dropped: previous tick still in flight"
            );
            return TickOutcome::Dropped;
        };

        self.stats.write().await.ticks += 1;

        let raw = match self.source.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.write().await.fetch_errors += 1;
                self.record_failure(&mut state, &e).await;
                return TickOutcome::Failed(e);
            }
        };

        let previous = state.filter;
        let (next, event) = self.filter.advance(previous, raw);

        let outcome = match event {
            FilterEvent::None => {
                state.filter = next;
                TickOutcome::Sampled { raw }
            }
            FilterEvent::StableChanged(count) => {
                match self.store.insert(self.config.camera_id, count).await {
                    Ok(entry) => {
                        state.filter = next;
                        tracing::info!(
                            camera_id = entry.camera_id,
                            count = entry.count,
                            id = entry.id,
                            previous = ?previous.last_stable_value(),
                            "Stable vehicle count persisted"
                        );
                        TickOutcome::Persisted(entry)
                    }
                    Err(e) => {
                        // keep the old stable value so the change is retried next tick
                        state.filter = next.revert_stable(&previous);
                        {
                            let mut stats = self.stats.write().await;
                            stats.samples += 1;
                            stats.persist_errors += 1;
                        }
                        self.record_failure(&mut state, &e).await;
                        return TickOutcome::Failed(e);
                    }
                }
            }
        };

        if let Some(StreakEvent::Recovered { after }) = state.errors.record_success() {
            tracing::info!(
                camera_id = self.config.camera_id,
                after_errors = after,
                "Raw source polling recovered"
            );
        }

        let mut stats = self.stats.write().await;
        stats.samples += 1;
        if matches!(outcome, TickOutcome::Persisted(_)) {
            stats.stable_changes += 1;
        }
        stats.consecutive_errors = 0;
        stats.last_raw_value = state.filter.last_raw_value();
        stats.last_stable_value = state.filter.last_stable_value();

        outcome
    }

    async fn record_failure(&self, state: &mut TickState, error: &Error) {
        let report = state.errors.record_error();
        if report.should_log {
            tracing::warn!(
                camera_id = self.config.camera_id,
                kind = error.kind(),
                error = %error,
                consecutive_errors = report.streak,
                "Poll tick failed"
            );
        }

        let mut stats = self.stats.write().await;
        stats.consecutive_errors = report.streak;
        stats.last_raw_value = state.filter.last_raw_value();
        stats.last_stable_value = state.filter.last_stable_value();
    }
}
