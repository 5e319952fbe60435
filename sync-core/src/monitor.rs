//! Reconnect decision state.
//!
//! Pure state for the reconnect monitor: an offline latch plus the probe
//! backoff from [`crate::backoff`]. Each health-probe outcome produces a new
//! state, and a probe success reports whether the caller should attempt an
//! identity sync. The polling loop in `keysync-client` performs the actual
//! probes and sync calls; this module never does I/O.

use crate::backoff::{BreakerConfig, BreakerState};
use std::time::Duration;

/// Offline latch + probe backoff for one reconnect monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorState {
    was_offline: bool,
    breaker: BreakerState,
}

impl MonitorState {
    /// Create a fresh state: online, backoff at the base interval.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            was_offline: false,
            breaker: BreakerState::new(config),
        }
    }

    /// The delay before the next probe tick.
    pub fn interval(&self) -> Duration {
        self.breaker.current_interval()
    }

    /// Whether a probe has failed since the last sync attempt.
    pub fn was_offline(&self) -> bool {
        self.was_offline
    }

    /// How many probes have failed in a row.
    pub fn consecutive_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }

    /// A health probe failed: latch offline and widen the retry interval.
    pub fn on_probe_failure(self) -> Self {
        Self {
            was_offline: true,
            breaker: self.breaker.record_failure(),
        }
    }

    /// A health probe succeeded: reset the backoff.
    ///
    /// Returns the new state and whether the caller should attempt an
    /// identity sync, which is the case exactly when the monitor had
    /// latched offline and the user is not authenticated. The latch clears
    /// only in that branch; while the user stays authenticated a prior
    /// offline period remains latched for a later sign-out.
    pub fn on_probe_success(self, authenticated: bool) -> (Self, bool) {
        let breaker = self.breaker.record_success();
        let attempt_sync = self.was_offline && !authenticated;
        let was_offline = if attempt_sync { false } else { self.was_offline };

        (
            Self {
                was_offline,
                breaker,
            },
            attempt_sync,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BreakerConfig {
        BreakerConfig {
            base_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(8000),
            max_failures: 5,
        }
    }

    #[test]
    fn starts_online_at_base_interval() {
        let state = MonitorState::new(test_config());
        assert!(!state.was_offline());
        assert_eq!(state.interval(), Duration::from_millis(1000));
    }

    #[test]
    fn failure_run_backs_off_then_success_resets() {
        let state = MonitorState::new(test_config());

        let state = state.on_probe_failure();
        assert_eq!(state.interval(), Duration::from_millis(1000));
        let state = state.on_probe_failure();
        assert_eq!(state.interval(), Duration::from_millis(2000));
        let state = state.on_probe_failure();
        assert_eq!(state.interval(), Duration::from_millis(4000));
        assert!(state.was_offline());

        let (state, _) = state.on_probe_success(false);
        assert_eq!(state.interval(), Duration::from_millis(1000));
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn success_without_prior_failure_does_not_trigger_sync() {
        let state = MonitorState::new(test_config());
        let (state, attempt) = state.on_probe_success(false);
        assert!(!attempt);
        assert!(!state.was_offline());
    }

    #[test]
    fn recovery_while_unauthenticated_triggers_one_sync() {
        let state = MonitorState::new(test_config()).on_probe_failure();

        let (state, attempt) = state.on_probe_success(false);
        assert!(attempt);
        assert!(!state.was_offline(), "latch clears when sync is attempted");

        // The next success is an ordinary healthy tick.
        let (_, attempt) = state.on_probe_success(false);
        assert!(!attempt);
    }

    #[test]
    fn recovery_while_authenticated_keeps_latch() {
        let state = MonitorState::new(test_config()).on_probe_failure();

        let (state, attempt) = state.on_probe_success(true);
        assert!(!attempt);
        assert!(
            state.was_offline(),
            "latch persists until an unauthenticated recovery"
        );

        // Sign-out later: the latched offline period now triggers a sync.
        let (state, attempt) = state.on_probe_success(false);
        assert!(attempt);
        assert!(!state.was_offline());
    }

    #[test]
    fn repeated_failures_keep_latch_set() {
        let mut state = MonitorState::new(test_config());
        for _ in 0..4 {
            state = state.on_probe_failure();
            assert!(state.was_offline());
        }
    }
}
