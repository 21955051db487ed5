//! Sliding-window circuit breaker.
//!
//! Admission is decided once per logical call via [`CircuitBreaker::try_acquire`];
//! every physical attempt then records one outcome into the window. Open and
//! half-open transitions are evaluated on access — a thread-per-call layer
//! runs no background timers.

use crate::config::{CircuitBreakerPolicy, SlidingWindowType};
use crate::errors::FaultKind;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected without reaching the transport
    Open,
    /// A bounded number of probe calls is admitted
    HalfOpen,
}

/// A named, shared circuit breaker instance.
pub struct CircuitBreaker {
    name: String,
    policy: CircuitBreakerPolicy,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    changed_at: Instant,
    window: VecDeque<Outcome>,
    half_open_admitted: u32,
    half_open_successes: u32,
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    at: Instant,
    failure: bool,
    slow: bool,
}

impl CircuitBreaker {
    /// Creates a closed breaker with an empty window.
    pub fn new(name: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                changed_at: Instant::now(),
                window: VecDeque::new(),
                half_open_admitted: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// The client name this breaker is keyed by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy this breaker was created with.
    pub fn policy(&self) -> &CircuitBreakerPolicy {
        &self.policy
    }

    /// Current state. With automatic open-to-half-open transition enabled,
    /// reading the state also performs any due timer transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        if self
            .policy
            .automatic_transition_from_open_to_half_open_enabled
        {
            self.refresh(&mut inner);
        }
        inner.state
    }

    /// Number of outcomes currently in the sliding window.
    pub fn recorded_calls(&self) -> usize {
        self.inner.lock().window.len()
    }

    /// The admission decision: true when the call may proceed.
    ///
    /// In half-open state each admission consumes one of the permitted
    /// probe slots.
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.half_open_admitted
                    < self.policy.permitted_number_of_calls_in_half_open_state
                {
                    inner.half_open_admitted += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Records a successful attempt.
    pub fn record_success(&self, elapsed: Duration) {
        self.record(false, elapsed);
    }

    /// Records a failed attempt.
    pub fn record_failure(&self, elapsed: Duration) {
        self.record(true, elapsed);
    }

    /// Records a transport fault, applying the ignore and record predicates:
    /// ignored kinds are recorded as neither success nor failure; with a
    /// non-empty record set, kinds outside it count as successes.
    pub fn record_fault(&self, kind: FaultKind, elapsed: Duration) {
        if self.policy.ignore_faults.contains(&kind) {
            return;
        }
        let failure =
            self.policy.record_faults.is_empty() || self.policy.record_faults.contains(&kind);
        self.record(failure, elapsed);
    }

    fn record(&self, failure: bool, elapsed: Duration) {
        let mut inner = self.inner.lock();
        self.refresh(&mut inner);
        let slow = elapsed >= self.policy.slow_call_duration_threshold;

        match inner.state {
            CircuitState::Closed => {
                self.push_outcome(&mut inner, failure, slow);
                if self.should_trip(&mut inner) {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                if failure {
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes
                        >= self.policy.permitted_number_of_calls_in_half_open_state
                    {
                        self.transition(&mut inner, CircuitState::Closed);
                    }
                }
            }
            // an attempt raced a transition to open; nothing to account
            CircuitState::Open => {}
        }
    }

    fn push_outcome(&self, inner: &mut Inner, failure: bool, slow: bool) {
        match self.policy.sliding_window_type {
            SlidingWindowType::Count => {
                while inner.window.len() as u32 >= self.policy.sliding_window_size {
                    inner.window.pop_front();
                }
            }
            SlidingWindowType::Time => self.prune(inner),
        }
        inner.window.push_back(Outcome {
            at: Instant::now(),
            failure,
            slow,
        });
    }

    // Drops time-window outcomes older than the window horizon.
    fn prune(&self, inner: &mut Inner) {
        let horizon = Duration::from_secs(u64::from(self.policy.sliding_window_size));
        while let Some(front) = inner.window.front() {
            if front.at.elapsed() > horizon {
                inner.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn should_trip(&self, inner: &mut Inner) -> bool {
        if self.policy.sliding_window_type == SlidingWindowType::Time {
            self.prune(inner);
        }

        let total = inner.window.len() as u32;
        if total < self.policy.minimum_number_of_calls.max(1) {
            return false;
        }

        let failures = inner.window.iter().filter(|o| o.failure).count() as f32;
        let slow = inner.window.iter().filter(|o| o.slow).count() as f32;
        let failure_rate = failures * 100.0 / total as f32;
        let slow_rate = slow * 100.0 / total as f32;

        failure_rate >= self.policy.failure_rate_threshold
            || slow_rate >= self.policy.slow_call_rate_threshold
    }

    // Timer-driven transitions, evaluated on access.
    fn refresh(&self, inner: &mut Inner) {
        match inner.state {
            CircuitState::Open => {
                if inner.changed_at.elapsed() >= self.policy.wait_duration_in_open_state {
                    self.transition(inner, CircuitState::HalfOpen);
                }
            }
            CircuitState::HalfOpen => {
                let max_wait = self.policy.max_wait_duration_in_half_open_state;
                if !max_wait.is_zero() && inner.changed_at.elapsed() >= max_wait {
                    self.transition(inner, CircuitState::Open);
                }
            }
            CircuitState::Closed => {}
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        inner.changed_at = Instant::now();
        inner.half_open_admitted = 0;
        inner.half_open_successes = 0;
        inner.window.clear();

        tracing::info!(
            breaker = %self.name,
            from = ?from,
            to = ?to,
            "circuit breaker state transition"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CircuitBreakerPolicy {
        CircuitBreakerPolicy {
            sliding_window_size: 2,
            minimum_number_of_calls: 2,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_millis(50),
            permitted_number_of_calls_in_half_open_state: 1,
            max_wait_duration_in_half_open_state: Duration::ZERO,
            ..Default::default()
        }
    }

    fn breaker(policy: CircuitBreakerPolicy) -> CircuitBreaker {
        CircuitBreaker::new("api", policy)
    }

    #[test]
    fn starts_closed_and_admits() {
        let cb = breaker(policy());
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn opens_at_the_failure_rate_threshold() {
        let cb = breaker(policy());

        cb.record_failure(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.try_acquire());
    }

    #[test]
    fn stays_closed_below_minimum_calls() {
        let cb = breaker(CircuitBreakerPolicy {
            minimum_number_of_calls: 5,
            sliding_window_size: 5,
            ..policy()
        });

        for _ in 0..4 {
            cb.record_failure(Duration::ZERO);
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn count_window_evicts_old_outcomes() {
        let cb = breaker(CircuitBreakerPolicy {
            sliding_window_size: 4,
            minimum_number_of_calls: 4,
            failure_rate_threshold: 75.0,
            ..policy()
        });

        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        for _ in 0..4 {
            cb.record_success(Duration::ZERO);
        }
        // the two failures were evicted; rate is 0 over the last 4
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn probes_half_open_after_the_open_wait() {
        let cb = breaker(policy());
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        assert!(!cb.try_acquire());

        std::thread::sleep(Duration::from_millis(70));
        assert!(cb.try_acquire());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_failure_reopens() {
        let cb = breaker(policy());
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(70));
        assert!(cb.try_acquire());

        cb.record_failure(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.try_acquire());
    }

    #[test]
    fn half_open_successes_close() {
        let cb = breaker(policy());
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(70));
        assert!(cb.try_acquire());

        cb.record_success(Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn half_open_admissions_are_bounded() {
        let cb = breaker(CircuitBreakerPolicy {
            permitted_number_of_calls_in_half_open_state: 2,
            ..policy()
        });
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(70));

        assert!(cb.try_acquire());
        assert!(cb.try_acquire());
        assert!(!cb.try_acquire());
    }

    #[test]
    fn half_open_expires_back_to_open() {
        let cb = breaker(CircuitBreakerPolicy {
            max_wait_duration_in_half_open_state: Duration::from_millis(30),
            ..policy()
        });
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(70));
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn slow_calls_trip_the_breaker() {
        let cb = breaker(CircuitBreakerPolicy {
            slow_call_rate_threshold: 50.0,
            slow_call_duration_threshold: Duration::from_millis(10),
            failure_rate_threshold: 100.0,
            ..policy()
        });

        cb.record_success(Duration::from_millis(20));
        cb.record_success(Duration::from_millis(20));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn ignored_faults_leave_the_window_untouched() {
        let cb = breaker(CircuitBreakerPolicy {
            ignore_faults: [FaultKind::Protocol].into(),
            ..policy()
        });

        cb.record_fault(FaultKind::Protocol, Duration::ZERO);
        cb.record_fault(FaultKind::Protocol, Duration::ZERO);
        assert_eq!(cb.recorded_calls(), 0);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn record_set_limits_which_faults_count_as_failures() {
        let cb = breaker(CircuitBreakerPolicy {
            record_faults: [FaultKind::Timeout].into(),
            ..policy()
        });

        // outside the record set: counted as successes
        cb.record_fault(FaultKind::Connect, Duration::ZERO);
        cb.record_fault(FaultKind::Connect, Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_fault(FaultKind::Timeout, Duration::ZERO);
        cb.record_fault(FaultKind::Timeout, Duration::ZERO);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn manual_transition_mode_moves_only_on_admission() {
        let cb = breaker(CircuitBreakerPolicy {
            automatic_transition_from_open_to_half_open_enabled: false,
            ..policy()
        });
        cb.record_failure(Duration::ZERO);
        cb.record_failure(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(70));

        // a plain state read does not perform the move
        assert_eq!(cb.state(), CircuitState::Open);
        // an admission attempt does
        assert!(cb.try_acquire());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }
}
