//! # resilient-http
//!
//! Resilience decoration for outbound HTTP calls: rate limiting, circuit
//! breaking, and retry composed around a single blocking execution, per
//! named client.
//!
//! ## Guarantees
//!
//! The three decorators nest in a fixed order — rate limiter outermost,
//! circuit breaker middle, retry innermost — which yields the accounting
//! this layer exists for:
//!
//! - one rate-limit permit per **logical call**, however many attempts it
//!   takes,
//! - one circuit-breaker admission decision per logical call,
//! - one breaker-window data point per **physical attempt**.
//!
//! Instances are keyed by client name in a shared [`ResilienceRegistry`]:
//! resolving the same name twice returns the same live instance, so breaker
//! state and permit budgets survive reconfiguration and are shared across
//! threads.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use resilient_http::config::ResilienceSettings;
//! use resilient_http::observability::NoopCallObserver;
//! use resilient_http::resilience::{ResilienceInterceptor, ResilienceRegistry};
//! use resilient_http::transport::{BlockingReqwestTransport, HttpRequest};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ResilienceRegistry::new();
//!     let settings: ResilienceSettings = serde_json::from_str(
//!         r#"{
//!             "retry-enabled": true,
//!             "retry": { "max-attempts": 3, "wait-duration": "250ms", "retry-status": [502, 503] }
//!         }"#,
//!     )?;
//!
//!     let interceptor =
//!         ResilienceInterceptor::from_settings(&registry, "orders", &settings, Arc::new(NoopCallObserver))?
//!             .expect("at least one primitive enabled");
//!
//!     let transport = BlockingReqwestTransport::new(Duration::from_secs(10))?;
//!     let url: url::Url = "https://api.example.com/orders".parse()?;
//!     let response = interceptor.execute(&transport, &HttpRequest::get(url))?;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Module organization
//!
//! - `config` - sparse settings records, resolved policies, registry defaults
//! - `errors` - error taxonomy and transport fault kinds
//! - `resilience` - the primitives, the named-instance registry, and the
//!   decoration pipeline
//! - `transport` - the blocking execute seam and a `reqwest`-backed transport
//! - `observability` - per-attempt observation events and logging setup

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod errors;
pub mod observability;
pub mod resilience;
pub mod transport;

// Development/testing modules
#[cfg(test)]
pub mod mocks;

// Re-exports for convenience
pub use config::{
    CircuitBreakerPolicy, CircuitBreakerSettings, RateLimiterPolicy, RateLimiterSettings,
    ResilienceDefaults, ResilienceSettings, RetryPolicy, RetrySettings, SlidingWindowType,
};
pub use errors::{FaultKind, ResilienceError, ResilienceResult, TransportFault};
pub use observability::{
    init_logging, AttemptObservation, CallObserver, InMemoryCallObserver, LogFormat, LogLevel,
    LoggingConfig, NoopCallObserver,
};
pub use resilience::{
    interval_fn, CircuitBreaker, CircuitState, DecorationStage, FailureCause, IntervalFn,
    RateLimiter, ResilienceInterceptor, ResilienceRegistry, Retry, RetryableOutcome,
    DECORATION_ORDER,
};
pub use transport::{BlockingReqwestTransport, HttpExecute, HttpRequest};
