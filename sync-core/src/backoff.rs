//! Probe backoff with a failure-count circuit breaker.
//!
//! This module computes the retry interval the reconnect monitor waits
//! between health probes. Consecutive failures double the interval up to a
//! hard ceiling; once the failure threshold is reached the interval pins to
//! the ceiling until a success resets it.
//!
//! All types here are pure values. Recording a failure or success consumes
//! the state and returns a new one; nothing is mutated in place.

use std::time::Duration;

/// Tuning for [`BreakerState`].
///
/// All values must be positive. `base_interval <= max_interval` is the
/// caller's responsibility and is not validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Probe interval while the remote service is healthy.
    pub base_interval: Duration,
    /// Ceiling for the backed-off interval.
    pub max_interval: Duration,
    /// Consecutive failures after which the interval pins to the ceiling.
    pub max_failures: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(10_000),
            max_interval: Duration::from_millis(60_000),
            max_failures: 5,
        }
    }
}

/// Failure-counting backoff state.
///
/// Invariant: `base_interval <= current_interval <= max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerState {
    config: BreakerConfig,
    consecutive_failures: u32,
    current_interval: Duration,
}

impl BreakerState {
    /// Create a fresh state: zero failures, interval at the base.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            current_interval: config.base_interval,
        }
    }

    /// Record a probe failure and widen the interval.
    ///
    /// The exponent is bounded by the `max/base` ratio before the multiply,
    /// so repeated doubling can never overflow regardless of how long an
    /// outage lasts.
    pub fn record_failure(self) -> Self {
        let failures = self.consecutive_failures.saturating_add(1);
        let base_ms = self.config.base_interval.as_millis() as u64;
        let max_ms = self.config.max_interval.as_millis() as u64;

        let interval_ms = if failures >= self.config.max_failures {
            // Circuit fully open: pinned to the ceiling.
            max_ms
        } else {
            let ratio = (max_ms / base_ms.max(1)).max(1);
            let exponent = failures - 1;
            let multiplier = if exponent >= 63 {
                ratio
            } else {
                (1u64 << exponent).min(ratio)
            };
            base_ms.saturating_mul(multiplier).min(max_ms)
        };

        Self {
            consecutive_failures: failures,
            current_interval: Duration::from_millis(interval_ms),
            ..self
        }
    }

    /// Record a probe success: failures cleared, interval back to the base.
    pub fn record_success(self) -> Self {
        Self {
            consecutive_failures: 0,
            current_interval: self.config.base_interval,
            ..self
        }
    }

    /// The interval to wait before the next probe.
    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// How many probes have failed in a row.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the failure threshold has been reached.
    pub fn is_open(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
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
    fn fresh_state_uses_base_interval() {
        let state = BreakerState::new(test_config());
        assert_eq!(state.current_interval(), Duration::from_millis(1000));
        assert_eq!(state.consecutive_failures(), 0);
        assert!(!state.is_open());
    }

    #[test]
    fn default_config_matches_production_tuning() {
        let config = BreakerConfig::default();
        assert_eq!(config.base_interval, Duration::from_millis(10_000));
        assert_eq!(config.max_interval, Duration::from_millis(60_000));
        assert_eq!(config.max_failures, 5);
    }

    #[test]
    fn failures_double_the_interval() {
        let state = BreakerState::new(test_config());

        let state = state.record_failure();
        assert_eq!(state.current_interval(), Duration::from_millis(1000));

        let state = state.record_failure();
        assert_eq!(state.current_interval(), Duration::from_millis(2000));

        let state = state.record_failure();
        assert_eq!(state.current_interval(), Duration::from_millis(4000));
    }

    #[test]
    fn interval_is_monotonic_and_capped() {
        let mut state = BreakerState::new(test_config());
        let mut previous = state.current_interval();

        for _ in 0..20 {
            state = state.record_failure();
            assert!(state.current_interval() >= previous);
            assert!(state.current_interval() <= Duration::from_millis(8000));
            previous = state.current_interval();
        }
    }

    #[test]
    fn threshold_pins_interval_to_ceiling() {
        let mut state = BreakerState::new(test_config());
        for _ in 0..5 {
            state = state.record_failure();
        }

        assert!(state.is_open());
        assert_eq!(state.current_interval(), Duration::from_millis(8000));

        // Further failures keep it pinned exactly at the ceiling.
        state = state.record_failure();
        assert!(state.is_open());
        assert_eq!(state.current_interval(), Duration::from_millis(8000));
    }

    #[test]
    fn success_resets_from_any_state() {
        let mut state = BreakerState::new(test_config());
        for _ in 0..7 {
            state = state.record_failure();
        }

        let state = state.record_success();
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.current_interval(), Duration::from_millis(1000));
        assert!(!state.is_open());
    }

    #[test]
    fn low_threshold_opens_before_doubling_finishes() {
        let config = BreakerConfig {
            base_interval: Duration::from_millis(1000),
            max_interval: Duration::from_millis(60_000),
            max_failures: 2,
        };
        let state = BreakerState::new(config).record_failure();
        assert_eq!(state.current_interval(), Duration::from_millis(1000));

        // Second failure hits the threshold and jumps straight to the ceiling.
        let state = state.record_failure();
        assert_eq!(state.current_interval(), Duration::from_millis(60_000));
    }

    #[test]
    fn sustained_outage_does_not_overflow() {
        let config = BreakerConfig {
            base_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(u64::MAX / 2),
            max_failures: u32::MAX,
        };
        let mut state = BreakerState::new(config);
        for _ in 0..100 {
            state = state.record_failure();
        }
        assert!(state.current_interval() <= config.max_interval);
    }
}
