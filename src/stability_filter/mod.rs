//! StabilityFilter - Run-length stability over raw samples
//!
//! ## Responsibilities
//!
//! - Track how many consecutive raw samples carried the same value
//! - Report a stable change once a value has held for `threshold` samples
//!   and differs from the last stable value
//!
//! The filter itself is stateless; `FilterState` is threaded through each
//! call by the owner (the polling orchestrator).

use serde::Serialize;

/// Default number of identical samples needed to call a value stable
pub const DEFAULT_STABLE_THRESHOLD: u32 = 5;

/// Per-poller filter state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    last_raw_value: Option<i64>,
    same_value_streak: u32,
    last_stable_value: Option<i64>,
}

impl FilterState {
    pub fn last_raw_value(&self) -> Option<i64> {
        self.last_raw_value
    }

    /// Consecutive identical samples, including the most recent one
    pub fn same_value_streak(&self) -> u32 {
        self.same_value_streak
    }

    /// Last value that was emitted as stable
    pub fn last_stable_value(&self) -> Option<i64> {
        self.last_stable_value
    }

    /// Undo the stable commit of an `advance` whose change could not be persisted.
    ///
    /// Raw value and streak keep moving; only `last_stable_value` goes back to
    /// `previous`, so the same change is emitted again on the next sample.
    pub fn revert_stable(self, previous: &FilterState) -> Self {
        Self {
            last_stable_value: previous.last_stable_value,
            ..self
        }
    }
}

/// Outcome of feeding one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEvent {
    None,
    StableChanged(i64),
}

/// Run-length stability filter
#[derive(Debug, Clone, Copy)]
pub struct StabilityFilter {
    threshold: u32,
}

impl StabilityFilter {
    /// Create filter; thresholds below 1 are treated as 1
    pub fn new(threshold: i64) -> Self {
        let threshold = threshold.clamp(1, u32::MAX as i64) as u32;
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Feed one raw sample
    pub fn advance(&self, state: FilterState, raw_value: i64) -> (FilterState, FilterEvent) {
        let mut next = state;

        if state.last_raw_value == Some(raw_value) {
            next.same_value_streak = state.same_value_streak.saturating_add(1);
        } else {
            next.last_raw_value = Some(raw_value);
            next.same_value_streak = 1;
        }

        if next.same_value_streak >= self.threshold && state.last_stable_value != Some(raw_value) {
            next.last_stable_value = Some(raw_value);
            return (next, FilterEvent::StableChanged(raw_value));
        }

        (next, FilterEvent::None)
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_STABLE_THRESHOLD as i64)
    }
}
