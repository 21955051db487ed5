//! Fixed-refresh-period rate limiter.
//!
//! `limit_for_period` permits become available at the start of every
//! `limit_refresh_period` cycle. Permits are never handed back: the pipeline
//! takes exactly one per logical call, so retries inside a call can never
//! consume additional permits.

use crate::config::RateLimiterPolicy;
use crate::errors::{ResilienceError, ResilienceResult};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// A named, shared rate limiter instance.
pub struct RateLimiter {
    name: String,
    policy: RateLimiterPolicy,
    cycle: Mutex<Cycle>,
}

#[derive(Debug)]
struct Cycle {
    started_at: Instant,
    permits_used: u32,
}

impl RateLimiter {
    /// Creates a limiter with a full permit budget for the current cycle.
    pub fn new(name: impl Into<String>, policy: RateLimiterPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            cycle: Mutex::new(Cycle {
                started_at: Instant::now(),
                permits_used: 0,
            }),
        }
    }

    /// The client name this limiter is keyed by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy this limiter was created with.
    pub fn policy(&self) -> &RateLimiterPolicy {
        &self.policy
    }

    /// Takes a permit without waiting.
    pub fn try_acquire(&self) -> bool {
        self.take().is_ok()
    }

    /// Permits still free in the current cycle.
    pub fn available_permits(&self) -> u32 {
        let mut cycle = self.cycle.lock();
        self.roll(&mut cycle);
        self.policy.limit_for_period - cycle.permits_used
    }

    /// Takes one permit, blocking up to the policy's acquisition timeout.
    ///
    /// A zero timeout fails immediately when no permit is free.
    pub fn acquire(&self) -> ResilienceResult<()> {
        let timeout = self.policy.timeout_duration;
        let deadline = Instant::now() + timeout;

        loop {
            let wait = match self.take() {
                Ok(()) => return Ok(()),
                Err(wait) => wait,
            };

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    limiter = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "permit not granted within acquisition timeout"
                );
                return Err(ResilienceError::RateLimited {
                    client: self.name.clone(),
                    timeout,
                });
            }
            std::thread::sleep(wait.min(deadline - now));
        }
    }

    // Ok on success, Err(time until the next cycle) when exhausted.
    fn take(&self) -> Result<(), Duration> {
        let mut cycle = self.cycle.lock();
        self.roll(&mut cycle);

        if cycle.permits_used < self.policy.limit_for_period {
            cycle.permits_used += 1;
            tracing::trace!(limiter = %self.name, used = cycle.permits_used, "permit granted");
            Ok(())
        } else {
            let into_cycle = cycle.started_at.elapsed();
            Err(self
                .policy
                .limit_refresh_period
                .saturating_sub(into_cycle))
        }
    }

    // Advances the cycle by whole refresh periods so boundaries stay stable.
    fn roll(&self, cycle: &mut Cycle) {
        let period = self.policy.limit_refresh_period;
        let elapsed = cycle.started_at.elapsed();
        if elapsed >= period {
            let periods = (elapsed.as_nanos() / period.as_nanos()) as u32;
            cycle.started_at += period * periods;
            cycle.permits_used = 0;
        }
    }
}
