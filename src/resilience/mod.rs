//! Resilience primitives and their composition around a blocking HTTP
//! execution.

mod backoff;
mod circuit_breaker;
mod classify;
mod interceptor;
mod rate_limiter;
mod registry;
mod retry;


pub use backoff::{interval_fn, IntervalFn, DEFAULT_CAP_FACTOR};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use classify::{classify, status_is_retryable, FailureCause, RetryableOutcome};
pub use interceptor::{DecorationStage, ResilienceInterceptor, DECORATION_ORDER};
pub use rate_limiter::RateLimiter;
pub use registry::ResilienceRegistry;
pub use retry::Retry;
