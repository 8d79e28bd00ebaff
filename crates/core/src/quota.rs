//! Fixed-window quota arithmetic, independent of where counters live.

use std::time::Duration;

use serde::Serialize;

/// Default points per window for track processing.
pub const DEFAULT_QUOTA_POINTS: i32 = 10;

/// Default window length (24 hours).
pub const DEFAULT_QUOTA_WINDOW: Duration = Duration::from_secs(86_400);

/// Key prefix for per-user track processing counters.
pub const TRACK_PROCESSING_PREFIX: &str = "rate_limiter_track_processing";

/// Points granted per window and the window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub points: i32,
    pub window: Duration,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            points: DEFAULT_QUOTA_POINTS,
            window: DEFAULT_QUOTA_WINDOW,
        }
    }
}

impl QuotaPolicy {
    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }

    /// Counter key for one user.
    pub fn key_for(user_id: &str) -> String {
        format!("{TRACK_PROCESSING_PREFIX}:{user_id}")
    }

    /// Full quota, nothing consumed, nothing to wait for. Reported for users
    /// without a live window and when enforcement is off.
    pub fn fresh(&self) -> QuotaState {
        QuotaState {
            remaining_points: self.points,
            consumed_points: 0,
            ms_before_next_refill: 0,
        }
    }

    /// Derive the observable state from the raw counter.
    pub fn state_from(&self, consumed_points: i32, ms_before_next_refill: i64) -> QuotaState {
        QuotaState {
            remaining_points: (self.points - consumed_points).max(0),
            consumed_points,
            ms_before_next_refill: ms_before_next_refill.max(0),
        }
    }

    /// A consumption is rejected when it leaves no points available, so
    /// `points - 1` consumptions succeed per window.
    pub fn is_exceeded(&self, consumed_points: i32) -> bool {
        consumed_points >= self.points
    }
}

/// Per-user quota as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaState {
    pub remaining_points: i32,
    pub consumed_points: i32,
    pub ms_before_next_refill: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_that_empties_the_window_fails() {
        let policy = QuotaPolicy::default();
        assert!(!policy.is_exceeded(9));
        assert!(policy.is_exceeded(10));
        assert!(policy.is_exceeded(11));
        assert_eq!(policy.state_from(10, 1).remaining_points, 0);
    }

    #[test]
    fn remaining_never_negative() {
        let policy = QuotaPolicy {
            points: 2,
            window: Duration::from_secs(60),
        };
        assert_eq!(policy.state_from(1, 500).remaining_points, 1);
        assert_eq!(policy.state_from(5, 500).remaining_points, 0);
        assert_eq!(policy.state_from(5, -3).ms_before_next_refill, 0);
    }

    #[test]
    fn fresh_state_is_full() {
        let policy = QuotaPolicy::default();
        let state = policy.fresh();
        assert_eq!(state.remaining_points, 10);
        assert_eq!(state.consumed_points, 0);
        assert_eq!(state.ms_before_next_refill, 0);
        assert_eq!(policy.window_ms(), 86_400_000);
    }

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(
            QuotaPolicy::key_for("u1"),
            "rate_limiter_track_processing:u1"
        );
    }
}
