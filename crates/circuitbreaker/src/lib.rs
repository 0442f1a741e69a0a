//! Per-worker circuit breaker for site-wide outages (§4.6).
//!
//! Each fetch worker owns its own [`CircuitBreaker`]; state is neither
//! shared across workers nor persisted across restarts. Two workers can
//! independently trip on the same domain and double-count its failures —
//! an accepted limitation, not mitigated here (no per-domain cooldown key).

use std::time::Duration;

use metrics::{counter, gauge};
use otto_metrics::page_fetcher::{
    CIRCUIT_BREAKER_CLOSED_TOTAL, CIRCUIT_BREAKER_CONSECUTIVE_FAILURES,
    CIRCUIT_BREAKER_CURRENT_BACKOFF_SECONDS, CIRCUIT_BREAKER_OPENED_TOTAL, CIRCUIT_BREAKER_STATE,
};

/// The circuit's current position in the closed -> open -> half_open cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(300),
            backoff_multiplier: 2.0,
        }
    }
}

/// Trips after `failure_threshold` consecutive site-wide failures. While
/// open, the worker should stop dequeuing for this domain entirely; after
/// the backoff elapses the breaker moves to half-open and allows one probe.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    consecutive_failures: u32,
    current_backoff: Duration,
    backoff_tier: u32,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let current_backoff = config.initial_backoff;
        Self {
            config,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            current_backoff,
            backoff_tier: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// True when the breaker is half-open and the worker should attempt a
    /// single probe request rather than its normal fetch loop.
    pub fn should_probe(&self) -> bool {
        self.state == CircuitState::HalfOpen
    }

    /// Resets the failure counter. A success while half-open closes the
    /// circuit and resets the backoff schedule.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.state == CircuitState::HalfOpen {
            self.state = CircuitState::Closed;
            self.current_backoff = self.config.initial_backoff;
            self.backoff_tier = 0;
            counter!(CIRCUIT_BREAKER_CLOSED_TOTAL).increment(1);
        }
        gauge!(CIRCUIT_BREAKER_STATE).set(self.state as u8 as f64);
        gauge!(CIRCUIT_BREAKER_CONSECUTIVE_FAILURES).set(0.0);
        gauge!(CIRCUIT_BREAKER_CURRENT_BACKOFF_SECONDS).set(0.0);
    }

    /// Counts a site-wide failure. Trips the breaker when the threshold is
    /// reached while closed. Does not itself handle the half-open case —
    /// callers in the half-open state call [`record_probe_failure`] first.
    ///
    /// [`record_probe_failure`]: CircuitBreaker::record_probe_failure
    pub fn record_site_wide_failure(&mut self) {
        self.consecutive_failures += 1;
        gauge!(CIRCUIT_BREAKER_CONSECUTIVE_FAILURES).set(self.consecutive_failures as f64);
        if self.state == CircuitState::Closed && self.consecutive_failures >= self.config.failure_threshold {
            self.state = CircuitState::Open;
            counter!(CIRCUIT_BREAKER_OPENED_TOTAL).increment(1);
            gauge!(CIRCUIT_BREAKER_STATE).set(self.state as u8 as f64);
        }
    }

    /// Called when a half-open probe fails. Reopens the circuit
    /// unconditionally; the caller also calls [`record_site_wide_failure`]
    /// to count the failure toward the consecutive-failure gauge.
    ///
    /// [`record_site_wide_failure`]: CircuitBreaker::record_site_wide_failure
    pub fn record_probe_failure(&mut self) {
        self.state = CircuitState::Open;
        gauge!(CIRCUIT_BREAKER_STATE).set(self.state as u8 as f64);
    }

    /// If open, sleeps for the current backoff and transitions to
    /// half-open, growing the backoff for the *next* tier. Returns
    /// immediately if already closed or half-open.
    pub async fn wait_if_open(&mut self) {
        if self.state != CircuitState::Open {
            return;
        }
        gauge!(CIRCUIT_BREAKER_CURRENT_BACKOFF_SECONDS).set(self.current_backoff.as_secs_f64());
        tokio::time::sleep(self.current_backoff).await;
        self.state = CircuitState::HalfOpen;
        gauge!(CIRCUIT_BREAKER_STATE).set(self.state as u8 as f64);
        self.backoff_tier += 1;
        let scaled = self.config.initial_backoff.as_secs_f64()
            * self.config.backoff_multiplier.powi(self.backoff_tier as i32);
        self.current_backoff =
            Duration::from_secs_f64(scaled.min(self.config.max_backoff.as_secs_f64()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            backoff_multiplier: 2.0,
        })
    }

    #[test]
    fn stays_closed_below_threshold() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn trips_open_at_threshold() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_success();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_transitions_to_half_open_after_backoff() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        assert_eq!(b.state(), CircuitState::Open);
        b.wait_if_open().await;
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(b.should_probe());
    }

    #[tokio::test]
    async fn failed_probe_reopens_with_longer_backoff() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.wait_if_open().await;
        let first_backoff = b.current_backoff;
        b.record_probe_failure();
        b.record_site_wide_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert!(first_backoff <= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn record_probe_failure_reopens_without_touching_counter() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.wait_if_open().await;
        assert_eq!(b.state(), CircuitState::HalfOpen);
        b.record_probe_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.consecutive_failures, 3);
    }

    #[tokio::test]
    async fn successful_probe_closes_and_resets_backoff() {
        let mut b = breaker();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.record_site_wide_failure();
        b.wait_if_open().await;
        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.current_backoff, Duration::from_millis(10));
    }
}
