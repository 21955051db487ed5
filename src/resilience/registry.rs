//! Named-instance registry.
//!
//! One live instance per (primitive kind, client name) for the lifetime of
//! the process. Resolution is idempotent: the first registration fixes both
//! the instance and its configuration; later resolutions return the existing
//! instance and ignore their settings argument, so breaker state, limiter
//! cycles, and retry policies survive re-resolution.

use crate::config::{
    CircuitBreakerPolicy, CircuitBreakerSettings, RateLimiterPolicy, RateLimiterSettings,
    ResilienceDefaults, RetryPolicy, RetrySettings,
};
use crate::errors::ResilienceResult;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::retry::Retry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe store of named resilience instances.
///
/// An explicitly passed handle, not a global: embedders create one and
/// share it wherever clients are built.
#[derive(Default)]
pub struct ResilienceRegistry {
    defaults: ResilienceDefaults,
    circuit_breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    retries: RwLock<HashMap<String, Arc<Retry>>>,
    rate_limiters: RwLock<HashMap<String, Arc<RateLimiter>>>,
}

impl ResilienceRegistry {
    /// Creates a registry with library default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with custom default policies.
    pub fn with_defaults(defaults: ResilienceDefaults) -> Self {
        Self {
            defaults,
            ..Default::default()
        }
    }

    /// The defaults applied wherever settings leave a field unset.
    pub fn defaults(&self) -> &ResilienceDefaults {
        &self.defaults
    }

    /// Gets or creates the circuit breaker for `name`. Settings only apply
    /// on first creation.
    pub fn circuit_breaker(
        &self,
        name: &str,
        settings: &CircuitBreakerSettings,
    ) -> ResilienceResult<Arc<CircuitBreaker>> {
        if let Some(existing) = self.circuit_breakers.read().get(name) {
            return Ok(existing.clone());
        }
        let policy = CircuitBreakerPolicy::resolve(settings, &self.defaults.circuit_breaker)?;
        let mut map = self.circuit_breakers.write();
        Ok(map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, policy)))
            .clone())
    }

    /// Gets or creates the retry instance for `name`. Settings only apply
    /// on first creation.
    pub fn retry(&self, name: &str, settings: &RetrySettings) -> ResilienceResult<Arc<Retry>> {
        if let Some(existing) = self.retries.read().get(name) {
            return Ok(existing.clone());
        }
        let policy = RetryPolicy::resolve(settings, &self.defaults.retry)?;
        let mut map = self.retries.write();
        Ok(map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Retry::new(name, policy)))
            .clone())
    }

    /// Gets or creates the rate limiter for `name`. Settings only apply on
    /// first creation.
    pub fn rate_limiter(
        &self,
        name: &str,
        settings: &RateLimiterSettings,
    ) -> ResilienceResult<Arc<RateLimiter>> {
        if let Some(existing) = self.rate_limiters.read().get(name) {
            return Ok(existing.clone());
        }
        let policy = RateLimiterPolicy::resolve(settings, &self.defaults.rate_limiter)?;
        let mut map = self.rate_limiters.write();
        Ok(map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::new(name, policy)))
            .clone())
    }

    /// The already-registered circuit breaker for `name`, if any.
    pub fn find_circuit_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.circuit_breakers.read().get(name).cloned()
    }

    /// The already-registered retry instance for `name`, if any.
    pub fn find_retry(&self, name: &str) -> Option<Arc<Retry>> {
        self.retries.read().get(name).cloned()
    }

    /// The already-registered rate limiter for `name`, if any.
    pub fn find_rate_limiter(&self, name: &str) -> Option<Arc<RateLimiter>> {
        self.rate_limiters.read().get(name).cloned()
    }
}
