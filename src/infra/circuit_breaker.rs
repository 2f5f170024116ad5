//! Per-endpoint circuit breaker (spec.md §4.2, used by component C2).
//!
//! Three states per endpoint: closed (calls pass through), open (calls fail
//! fast), half-open (one probe admitted after the cooldown). State is kept
//! in a `DashMap` keyed by endpoint so one flaky upstream doesn't trip calls
//! to another.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Entry {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(30),
        }
    }
}

pub struct CircuitBreaker {
    entries: DashMap<String, Entry>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Whether a call to `endpoint` may proceed. Moves `Open` to `HalfOpen`
    /// once the cooldown has elapsed, admitting the caller as the probe.
    pub fn allow_request(&self, endpoint: &str) -> bool {
        let mut entry = self.entries.entry(endpoint.to_string()).or_default();
        match entry.state {
            State::Closed => true,
            State::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.open_duration {
                    entry.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => true,
        }
    }

    pub fn record_success(&self, endpoint: &str) {
        let mut entry = self.entries.entry(endpoint.to_string()).or_default();
        entry.state = State::Closed;
        entry.consecutive_failures = 0;
        entry.opened_at = None;
    }

    pub fn record_failure(&self, endpoint: &str) {
        let mut entry = self.entries.entry(endpoint.to_string()).or_default();
        match entry.state {
            State::HalfOpen => {
                entry.state = State::Open;
                entry.opened_at = Some(Instant::now());
            }
            State::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= self.config.failure_threshold {
                    entry.state = State::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            open_duration: Duration::from_millis(10),
        })
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker();
        assert!(breaker.allow_request("ep"));
        breaker.record_failure("ep");
        assert!(breaker.allow_request("ep"));
        breaker.record_failure("ep");
        assert!(!breaker.allow_request("ep"));
    }

    #[test]
    fn half_opens_after_wait_and_closes_on_success() {
        let breaker = breaker();
        breaker.record_failure("ep");
        breaker.record_failure("ep");
        assert!(!breaker.allow_request("ep"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.allow_request("ep"));
        breaker.record_success("ep");
        assert!(breaker.allow_request("ep"));
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = breaker();
        breaker.record_failure("ep");
        breaker.record_failure("ep");
        assert!(!breaker.allow_request("ep"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.allow_request("ep")); // half-open now
        breaker.record_failure("ep");
        assert!(!breaker.allow_request("ep")); // reopened immediately, no second threshold wait
    }
}
