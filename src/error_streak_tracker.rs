//! Error Streak Tracker
//!
//! Counts consecutive poll failures so a sustained outage produces a bounded
//! number of log lines: the first error of a streak and every Nth after it,
//! plus one recovery notice when the streak ends.

/// Default log cadence during a streak
pub const DEFAULT_LOG_EVERY: u64 = 10;

/// Decision for one recorded error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReport {
    /// Length of the current streak, including this error
    pub streak: u64,
    /// Whether this error should be logged
    pub should_log: bool,
}

/// Streak transition on success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakEvent {
    /// A streak of `after` errors ended
    Recovered { after: u64 },
}

/// Tracks the current run of consecutive errors
#[derive(Debug, Clone)]
pub struct ErrorStreakTracker {
    consecutive_errors: u64,
    log_every: u64,
}

impl ErrorStreakTracker {
    /// Create new tracker with the default cadence
    pub fn new() -> Self {
        Self::with_log_every(DEFAULT_LOG_EVERY)
    }

    /// Create new tracker logging every `log_every`th error of a streak
    pub fn with_log_every(log_every: u64) -> Self {
        Self {
            consecutive_errors: 0,
            log_every: log_every.max(1),
        }
    }

    /// Current streak length
    pub fn consecutive_errors(&self) -> u64 {
        self.consecutive_errors
    }

    /// Record a failure
    ///
    /// Logged errors are number 1, 1 + N, 1 + 2N, ... of the streak.
    pub fn record_error(&mut self) -> ErrorReport {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        let should_log = (self.consecutive_errors - 1) % self.log_every == 0;

        ErrorReport {
            streak: self.consecutive_errors,
            should_log,
        }
    }

    /// Record a success and return the recovery event if a streak just ended
    pub fn record_success(&mut self) -> Option<StreakEvent> {
        let previous = std::mem::take(&mut self.consecutive_errors);
        (previous > 0).then_some(StreakEvent::Recovered { after: previous })
    }
}

impl Default for ErrorStreakTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_logged() {
        let mut tracker = ErrorStreakTracker::new();
        let report = tracker.record_error();
        assert_eq!(report, ErrorReport { streak: 1, should_log: true });
    }

    #[test]
    fn test_suppression_cadence() {
        let mut tracker = ErrorStreakTracker::new();
        let logged: Vec<u64> = (0..25)
            .map(|_| tracker.record_error())
            .filter(|r| r.should_log)
            .map(|r| r.streak)
            .collect();
        assert_eq!(logged, vec![1, 11, 21]);
    }

    #[test]
    fn test_success_without_streak_no_event() {
        let mut tracker = ErrorStreakTracker::new();
        assert!(tracker.record_success().is_none());
    }

    #[test]
    fn test_recovery_after_streak() {
        let mut tracker = ErrorStreakTracker::new();
        for _ in 0..3 {
            tracker.record_error();
        }
        assert_eq!(
            tracker.record_success(),
            Some(StreakEvent::Recovered { after: 3 })
        );
        assert_eq!(tracker.consecutive_errors(), 0);
        assert!(tracker.record_success().is_none());
    }

    #[test]
    fn test_new_streak_logs_first_error_again() {
        let mut tracker = ErrorStreakTracker::new();
        tracker.record_error();
        tracker.record_error();
        tracker.record_success();
        assert!(tracker.record_error().should_log);
    }
}
