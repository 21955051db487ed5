//! Backoff interval selection.
//!
//! A retry policy maps to one wait-interval function, chosen once when the
//! retry instance is created. Attempt numbers start at 1; the interval for
//! attempt `n` is the wait applied *after* the n-th failed attempt.

use crate::config::RetryPolicy;
use std::time::Duration;

/// Wait-interval function: attempt number to wait duration.
pub type IntervalFn = Box<dyn Fn(u32) -> Duration + Send + Sync>;

/// Cap applied to exponential growth when no explicit max wait is
/// configured: 10x the base wait duration.
pub const DEFAULT_CAP_FACTOR: u32 = 10;

/// Selects the interval function for a policy.
///
/// In priority order: exponential growth with jitter and a cap (explicit,
/// or 10x base when unset) whenever a multiplier is configured; fixed base
/// with jitter when only a jitter factor is configured; constant base
/// otherwise.
pub fn interval_fn(policy: &RetryPolicy) -> IntervalFn {
    let base = policy.wait_duration;
    match (
        policy.exponential_backoff_multiplier,
        policy.randomized_wait_factor,
    ) {
        (Some(multiplier), factor) => {
            let cap = policy
                .exponential_max_wait_duration
                .unwrap_or(base * DEFAULT_CAP_FACTOR);
            exponential(base, multiplier, factor.unwrap_or(0.0), cap)
        }
        (None, Some(factor)) => randomized(base, factor),
        (None, None) => constant(base),
    }
}

fn exponential(base: Duration, multiplier: f64, factor: f64, cap: Duration) -> IntervalFn {
    let base_ms = base.as_millis() as f64;
    let cap_ms = cap.as_millis() as f64;
    Box::new(move |attempt| {
        let grown = base_ms * multiplier.powi(attempt.saturating_sub(1) as i32);
        let jittered = apply_jitter(grown, factor);
        Duration::from_millis(jittered.min(cap_ms) as u64)
    })
}

fn randomized(base: Duration, factor: f64) -> IntervalFn {
    let base_ms = base.as_millis() as f64;
    Box::new(move |_attempt| Duration::from_millis(apply_jitter(base_ms, factor) as u64))
}

fn constant(base: Duration) -> IntervalFn {
    Box::new(move |_attempt| base)
}

fn apply_jitter(millis: f64, factor: f64) -> f64 {
    if factor <= 0.0 {
        return millis;
    }
    // uniform over [millis * (1 - factor), millis * (1 + factor)]
    millis * (1.0 - factor + 2.0 * factor * rand::random::<f64>())
}
