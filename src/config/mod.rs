//! Configuration for per-client resilience decoration.
//!
//! Two layers of types live here:
//!
//! - Sparse *settings* records ([`ResilienceSettings`] and the per-primitive
//!   `*Settings` structs): every field optional, deserializable from external
//!   config sources, durations bound as humantime strings (`"500ms"`,
//!   `"10s"`).
//! - Resolved *policies* ([`RetryPolicy`], [`CircuitBreakerPolicy`],
//!   [`RateLimiterPolicy`]): immutable, fully specified, produced only by the
//!   `resolve` factory functions which apply "registry default when unset"
//!   fallback per field and validate the result.

use crate::errors::{FaultKind, ResilienceError, ResilienceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default maximum number of physical attempts per logical call.
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default base wait between attempts.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_millis(500);

/// Default circuit breaker failure rate threshold, in percent.
pub const DEFAULT_FAILURE_RATE_THRESHOLD: f32 = 50.0;

/// Default sliding window size (outcomes for count-based, seconds for
/// time-based windows).
pub const DEFAULT_SLIDING_WINDOW_SIZE: u32 = 10;

/// Default minimum number of recorded calls before the failure rate is
/// evaluated.
pub const DEFAULT_MINIMUM_NUMBER_OF_CALLS: u32 = 10;

/// Default time the breaker stays open before probing.
pub const DEFAULT_WAIT_IN_OPEN_STATE: Duration = Duration::from_secs(10);

/// Default number of probe calls admitted while half-open.
pub const DEFAULT_PERMITTED_HALF_OPEN_CALLS: u32 = 3;

/// Default upper bound on time spent half-open (zero disables the bound).
pub const DEFAULT_MAX_WAIT_IN_HALF_OPEN_STATE: Duration = Duration::from_secs(5);

/// Default slow-call duration threshold.
pub const DEFAULT_SLOW_CALL_DURATION: Duration = Duration::from_secs(2);

/// Default rate limiter permits per refresh period.
pub const DEFAULT_LIMIT_FOR_PERIOD: u32 = 10;

/// Default rate limiter refresh period.
pub const DEFAULT_LIMIT_REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// Default permit acquisition timeout.
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_millis(500);

/// Sparse per-client resilience configuration, as bound from an external
/// config source. Nothing is decorated unless at least one primitive is
/// enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResilienceSettings {
    /// Enables circuit breaking for this client
    pub circuit_breaker_enabled: bool,
    /// Enables retry for this client
    pub retry_enabled: bool,
    /// Enables rate limiting for this client
    pub rate_limiter_enabled: bool,
    /// Retry settings, each field falling back to the registry default
    pub retry: RetrySettings,
    /// Circuit breaker settings, each field falling back to the registry default
    pub circuit_breaker: CircuitBreakerSettings,
    /// Rate limiter settings, each field falling back to the registry default
    pub rate_limiter: RateLimiterSettings,
}

/// Sparse retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetrySettings {
    /// Maximum physical attempts per logical call (>= 1)
    pub max_attempts: Option<u32>,
    /// Base wait between attempts
    #[serde(with = "humantime_serde")]
    pub wait_duration: Option<Duration>,
    /// Multiplicative backoff growth factor (>= 1)
    pub exponential_backoff_multiplier: Option<f64>,
    /// Jitter factor applied to each interval, within [0, 1)
    pub randomized_wait_factor: Option<f64>,
    /// Cap on the grown interval; unset means 10x the base wait
    #[serde(with = "humantime_serde")]
    pub exponential_max_wait_duration: Option<Duration>,
    /// Whether exhaustion surfaces as an error instead of the last response
    pub fail_after_max_attempts: Option<bool>,
    /// Fault kinds that always trigger a retry
    pub retry_faults: Option<BTreeSet<FaultKind>>,
    /// Fault kinds that never trigger a retry and propagate immediately
    pub ignore_faults: Option<BTreeSet<FaultKind>>,
    /// Status codes treated as retryable; empty means "any 5xx"
    pub retry_status: Option<BTreeSet<u16>>,
}

/// Sparse circuit breaker settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CircuitBreakerSettings {
    /// Failure rate (percent) at or above which the breaker opens
    pub failure_rate_threshold: Option<f32>,
    /// Slow-call rate (percent) at or above which the breaker opens
    pub slow_call_rate_threshold: Option<f32>,
    /// Duration from which a call counts as slow
    #[serde(with = "humantime_serde")]
    pub slow_call_duration_threshold: Option<Duration>,
    /// Window size: outcomes (count-based) or seconds (time-based)
    pub sliding_window_size: Option<u32>,
    /// Whether the window is count- or time-based
    pub sliding_window_type: Option<SlidingWindowType>,
    /// Minimum recorded outcomes before rates are evaluated
    pub minimum_number_of_calls: Option<u32>,
    /// Time spent open before the breaker probes again
    #[serde(with = "humantime_serde")]
    pub wait_duration_in_open_state: Option<Duration>,
    /// Probe calls admitted while half-open
    pub permitted_number_of_calls_in_half_open_state: Option<u32>,
    /// Whether plain state reads also perform the open -> half-open move
    pub automatic_transition_from_open_to_half_open_enabled: Option<bool>,
    /// Upper bound on time spent half-open; zero disables the bound
    #[serde(with = "humantime_serde")]
    pub max_wait_duration_in_half_open_state: Option<Duration>,
    /// Fault kinds recorded as neither success nor failure
    pub ignore_faults: Option<BTreeSet<FaultKind>>,
    /// When non-empty, only these fault kinds count as failures
    pub record_faults: Option<BTreeSet<FaultKind>>,
}

/// Sparse rate limiter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimiterSettings {
    /// Permits available per refresh period (>= 1)
    pub limit_for_period: Option<u32>,
    /// Length of one permit cycle
    #[serde(with = "humantime_serde")]
    pub limit_refresh_period: Option<Duration>,
    /// How long `acquire` may block waiting for a permit; zero fails fast
    #[serde(with = "humantime_serde")]
    pub timeout_duration: Option<Duration>,
}

/// How the circuit breaker's sliding window measures calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidingWindowType {
    /// Keep the last `sliding_window_size` outcomes
    #[default]
    Count,
    /// Keep outcomes from the last `sliding_window_size` seconds
    Time,
}

/// Fully resolved retry policy. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum physical attempts per logical call, always >= 1
    pub max_attempts: u32,
    /// Base wait between attempts
    pub wait_duration: Duration,
    /// Multiplicative backoff growth factor
    pub exponential_backoff_multiplier: Option<f64>,
    /// Jitter factor within [0, 1)
    pub randomized_wait_factor: Option<f64>,
    /// Explicit cap on the grown interval
    pub exponential_max_wait_duration: Option<Duration>,
    /// Whether exhaustion surfaces as an error instead of the last response
    pub fail_after_max_attempts: bool,
    /// Fault kinds that always trigger a retry
    pub retry_faults: BTreeSet<FaultKind>,
    /// Fault kinds that never trigger a retry
    pub ignore_faults: BTreeSet<FaultKind>,
    /// Retryable status codes; empty means "any 5xx"
    pub retry_status: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            wait_duration: DEFAULT_RETRY_WAIT,
            exponential_backoff_multiplier: None,
            randomized_wait_factor: None,
            exponential_max_wait_duration: None,
            fail_after_max_attempts: true,
            retry_faults: BTreeSet::from([FaultKind::Timeout, FaultKind::Connect]),
            ignore_faults: BTreeSet::new(),
            retry_status: BTreeSet::new(),
        }
    }
}

impl RetryPolicy {
    /// Resolves sparse settings against registry defaults and validates the
    /// result.
    pub fn resolve(settings: &RetrySettings, defaults: &RetryPolicy) -> ResilienceResult<Self> {
        let policy = Self {
            max_attempts: settings.max_attempts.unwrap_or(defaults.max_attempts),
            wait_duration: settings.wait_duration.unwrap_or(defaults.wait_duration),
            exponential_backoff_multiplier: settings
                .exponential_backoff_multiplier
                .or(defaults.exponential_backoff_multiplier),
            randomized_wait_factor: settings
                .randomized_wait_factor
                .or(defaults.randomized_wait_factor),
            exponential_max_wait_duration: settings
                .exponential_max_wait_duration
                .or(defaults.exponential_max_wait_duration),
            fail_after_max_attempts: settings
                .fail_after_max_attempts
                .unwrap_or(defaults.fail_after_max_attempts),
            retry_faults: settings
                .retry_faults
                .clone()
                .unwrap_or_else(|| defaults.retry_faults.clone()),
            ignore_faults: settings
                .ignore_faults
                .clone()
                .unwrap_or_else(|| defaults.ignore_faults.clone()),
            retry_status: settings
                .retry_status
                .clone()
                .unwrap_or_else(|| defaults.retry_status.clone()),
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> ResilienceResult<()> {
        if self.max_attempts < 1 {
            return Err(invalid("retry.max-attempts must be >= 1"));
        }
        if let Some(multiplier) = self.exponential_backoff_multiplier {
            if multiplier < 1.0 {
                return Err(invalid(
                    "retry.exponential-backoff-multiplier must be >= 1",
                ));
            }
        }
        if let Some(factor) = self.randomized_wait_factor {
            if !(0.0..1.0).contains(&factor) {
                return Err(invalid(
                    "retry.randomized-wait-factor must be within [0, 1)",
                ));
            }
        }
        Ok(())
    }
}

/// Fully resolved circuit breaker policy. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerPolicy {
    /// Failure rate (percent) at or above which the breaker opens
    pub failure_rate_threshold: f32,
    /// Slow-call rate (percent) at or above which the breaker opens
    pub slow_call_rate_threshold: f32,
    /// Duration from which a call counts as slow
    pub slow_call_duration_threshold: Duration,
    /// Window size: outcomes (count-based) or seconds (time-based)
    pub sliding_window_size: u32,
    /// Whether the window is count- or time-based
    pub sliding_window_type: SlidingWindowType,
    /// Minimum recorded outcomes before rates are evaluated
    pub minimum_number_of_calls: u32,
    /// Time spent open before the breaker probes again
    pub wait_duration_in_open_state: Duration,
    /// Probe calls admitted while half-open
    pub permitted_number_of_calls_in_half_open_state: u32,
    /// Whether plain state reads also perform the open -> half-open move
    pub automatic_transition_from_open_to_half_open_enabled: bool,
    /// Upper bound on time spent half-open; zero disables the bound
    pub max_wait_duration_in_half_open_state: Duration,
    /// Fault kinds recorded as neither success nor failure
    pub ignore_faults: BTreeSet<FaultKind>,
    /// When non-empty, only these fault kinds count as failures
    pub record_faults: BTreeSet<FaultKind>,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self {
            failure_rate_threshold: DEFAULT_FAILURE_RATE_THRESHOLD,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: DEFAULT_SLOW_CALL_DURATION,
            sliding_window_size: DEFAULT_SLIDING_WINDOW_SIZE,
            sliding_window_type: SlidingWindowType::Count,
            minimum_number_of_calls: DEFAULT_MINIMUM_NUMBER_OF_CALLS,
            wait_duration_in_open_state: DEFAULT_WAIT_IN_OPEN_STATE,
            permitted_number_of_calls_in_half_open_state: DEFAULT_PERMITTED_HALF_OPEN_CALLS,
            automatic_transition_from_open_to_half_open_enabled: true,
            max_wait_duration_in_half_open_state: DEFAULT_MAX_WAIT_IN_HALF_OPEN_STATE,
            ignore_faults: BTreeSet::new(),
            record_faults: BTreeSet::new(),
        }
    }
}

impl CircuitBreakerPolicy {
    /// Resolves sparse settings against registry defaults and validates the
    /// result.
    pub fn resolve(
        settings: &CircuitBreakerSettings,
        defaults: &CircuitBreakerPolicy,
    ) -> ResilienceResult<Self> {
        let policy = Self {
            failure_rate_threshold: settings
                .failure_rate_threshold
                .unwrap_or(defaults.failure_rate_threshold),
            slow_call_rate_threshold: settings
                .slow_call_rate_threshold
                .unwrap_or(defaults.slow_call_rate_threshold),
            slow_call_duration_threshold: settings
                .slow_call_duration_threshold
                .unwrap_or(defaults.slow_call_duration_threshold),
            sliding_window_size: settings
                .sliding_window_size
                .unwrap_or(defaults.sliding_window_size),
            sliding_window_type: settings
                .sliding_window_type
                .unwrap_or(defaults.sliding_window_type),
            minimum_number_of_calls: settings
                .minimum_number_of_calls
                .unwrap_or(defaults.minimum_number_of_calls),
            wait_duration_in_open_state: settings
                .wait_duration_in_open_state
                .unwrap_or(defaults.wait_duration_in_open_state),
            permitted_number_of_calls_in_half_open_state: settings
                .permitted_number_of_calls_in_half_open_state
                .unwrap_or(defaults.permitted_number_of_calls_in_half_open_state),
            automatic_transition_from_open_to_half_open_enabled: settings
                .automatic_transition_from_open_to_half_open_enabled
                .unwrap_or(defaults.automatic_transition_from_open_to_half_open_enabled),
            max_wait_duration_in_half_open_state: settings
                .max_wait_duration_in_half_open_state
                .unwrap_or(defaults.max_wait_duration_in_half_open_state),
            ignore_faults: settings
                .ignore_faults
                .clone()
                .unwrap_or_else(|| defaults.ignore_faults.clone()),
            record_faults: settings
                .record_faults
                .clone()
                .unwrap_or_else(|| defaults.record_faults.clone()),
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> ResilienceResult<()> {
        if !(0.0..=100.0).contains(&self.failure_rate_threshold)
            || self.failure_rate_threshold == 0.0
        {
            return Err(invalid(
                "circuit-breaker.failure-rate-threshold must be within (0, 100]",
            ));
        }
        if !(0.0..=100.0).contains(&self.slow_call_rate_threshold)
            || self.slow_call_rate_threshold == 0.0
        {
            return Err(invalid(
                "circuit-breaker.slow-call-rate-threshold must be within (0, 100]",
            ));
        }
        if self.sliding_window_size < 1 {
            return Err(invalid("circuit-breaker.sliding-window-size must be >= 1"));
        }
        if self.permitted_number_of_calls_in_half_open_state < 1 {
            return Err(invalid(
                "circuit-breaker.permitted-number-of-calls-in-half-open-state must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Fully resolved rate limiter policy. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterPolicy {
    /// Permits available per refresh period
    pub limit_for_period: u32,
    /// Length of one permit cycle
    pub limit_refresh_period: Duration,
    /// How long `acquire` may block waiting for a permit; zero fails fast
    pub timeout_duration: Duration,
}

impl Default for RateLimiterPolicy {
    fn default() -> Self {
        Self {
            limit_for_period: DEFAULT_LIMIT_FOR_PERIOD,
            limit_refresh_period: DEFAULT_LIMIT_REFRESH_PERIOD,
            timeout_duration: DEFAULT_ACQUISITION_TIMEOUT,
        }
    }
}

impl RateLimiterPolicy {
    /// Resolves sparse settings against registry defaults and validates the
    /// result.
    pub fn resolve(
        settings: &RateLimiterSettings,
        defaults: &RateLimiterPolicy,
    ) -> ResilienceResult<Self> {
        let policy = Self {
            limit_for_period: settings
                .limit_for_period
                .unwrap_or(defaults.limit_for_period),
            limit_refresh_period: settings
                .limit_refresh_period
                .unwrap_or(defaults.limit_refresh_period),
            timeout_duration: settings
                .timeout_duration
                .unwrap_or(defaults.timeout_duration),
        };
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> ResilienceResult<()> {
        if self.limit_for_period < 1 {
            return Err(invalid("rate-limiter.limit-for-period must be >= 1"));
        }
        if self.limit_refresh_period.is_zero() {
            return Err(invalid("rate-limiter.limit-refresh-period must be > 0"));
        }
        Ok(())
    }
}

/// Registry-wide default policies, applied field-by-field wherever a
/// client's settings leave a value unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResilienceDefaults {
    /// Default retry policy
    pub retry: RetryPolicy,
    /// Default circuit breaker policy
    pub circuit_breaker: CircuitBreakerPolicy,
    /// Default rate limiter policy
    pub rate_limiter: RateLimiterPolicy,
}

fn invalid(message: &str) -> ResilienceError {
    ResilienceError::Configuration {
        message: message.to_string(),
    }
}
