//! The decoration pipeline.
//!
//! Wraps one blocking HTTP execution with the client's named resilience
//! instances in a fixed nesting order: rate limiter outermost, circuit
//! breaker middle, retry innermost. The ordering is a correctness
//! invariant — it is what makes the accounting guarantees hold:
//!
//! - one rate-limit permit per logical call (never one per attempt),
//! - one circuit-breaker admission decision per logical call,
//! - one breaker-window data point per physical attempt.

use crate::config::{ResilienceSettings, RetryPolicy};
use crate::errors::{ResilienceError, ResilienceResult};
use crate::observability::{AttemptObservation, CallObserver};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::classify::{classify, FailureCause, RetryableOutcome};
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::registry::ResilienceRegistry;
use crate::resilience::retry::Retry;
use crate::transport::{HttpExecute, HttpRequest};
use bytes::Bytes;
use http::Response;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One stage of the decoration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationStage {
    /// Permit acquisition, decided before anything else runs
    RateLimiter,
    /// Admission decision, decided once per logical call
    CircuitBreaker,
    /// The attempt loop around the transport execution
    Retry,
}

/// Fixed nesting order, outermost first.
///
/// Encoded as data rather than left implicit in call order: a rate limiter
/// nested inside the retry loop would consume one permit per attempt
/// instead of per call.
pub const DECORATION_ORDER: [DecorationStage; 3] = [
    DecorationStage::RateLimiter,
    DecorationStage::CircuitBreaker,
    DecorationStage::Retry,
];

/// Decorates a blocking HTTP execution for one named client.
pub struct ResilienceInterceptor {
    client_name: String,
    rate_limiter: Option<Arc<RateLimiter>>,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
    retry: Option<Arc<Retry>>,
    // classification policy for the single attempt when retry is disabled:
    // empty status set (5xx rule), no fault predicates
    single_policy: RetryPolicy,
    observer: Arc<dyn CallObserver>,
}

impl ResilienceInterceptor {
    /// Assembles an interceptor from already resolved instances.
    pub fn new(
        client_name: impl Into<String>,
        rate_limiter: Option<Arc<RateLimiter>>,
        circuit_breaker: Option<Arc<CircuitBreaker>>,
        retry: Option<Arc<Retry>>,
        observer: Arc<dyn CallObserver>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            rate_limiter,
            circuit_breaker,
            retry,
            single_policy: RetryPolicy {
                max_attempts: 1,
                retry_status: BTreeSet::new(),
                retry_faults: BTreeSet::new(),
                ignore_faults: BTreeSet::new(),
                ..Default::default()
            },
            observer,
        }
    }

    /// Resolves the enabled primitives for `client_name` through the
    /// registry and assembles the interceptor.
    ///
    /// Returns `Ok(None)` when no primitive is enabled — the embedding
    /// client then installs nothing.
    pub fn from_settings(
        registry: &ResilienceRegistry,
        client_name: &str,
        settings: &ResilienceSettings,
        observer: Arc<dyn CallObserver>,
    ) -> ResilienceResult<Option<Self>> {
        if !(settings.retry_enabled
            || settings.circuit_breaker_enabled
            || settings.rate_limiter_enabled)
        {
            return Ok(None);
        }

        let retry = if settings.retry_enabled {
            Some(registry.retry(client_name, &settings.retry)?)
        } else {
            None
        };
        let circuit_breaker = if settings.circuit_breaker_enabled {
            Some(registry.circuit_breaker(client_name, &settings.circuit_breaker)?)
        } else {
            None
        };
        let rate_limiter = if settings.rate_limiter_enabled {
            Some(registry.rate_limiter(client_name, &settings.rate_limiter)?)
        } else {
            None
        };

        Ok(Some(Self::new(
            client_name,
            rate_limiter,
            circuit_breaker,
            retry,
            observer,
        )))
    }

    /// The client name this interceptor decorates.
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Executes one logical call through the decoration stages.
    pub fn execute(
        &self,
        transport: &dyn HttpExecute,
        request: &HttpRequest,
    ) -> ResilienceResult<Response<Bytes>> {
        // Outermost: one permit per logical call, taken before anything runs.
        if let Some(limiter) = &self.rate_limiter {
            limiter.acquire()?;
        }

        // Middle: one admission decision per logical call.
        if let Some(breaker) = &self.circuit_breaker {
            if !breaker.try_acquire() {
                tracing::warn!(
                    client = %self.client_name,
                    "call not permitted, circuit is open"
                );
                return Err(ResilienceError::CircuitOpen {
                    client: self.client_name.clone(),
                });
            }
        }

        // Innermost: the attempt loop.
        let result = match &self.retry {
            Some(retry) => {
                retry.execute(|attempt| self.attempt(transport, request, attempt, retry.policy()))
            }
            None => self.single_attempt(transport, request),
        };

        result.map_err(|error| self.normalize(error))
    }

    // Classification applies even without a retry layer; a retryable status
    // on the only attempt surfaces like an exhaustion after one attempt.
    fn single_attempt(
        &self,
        transport: &dyn HttpExecute,
        request: &HttpRequest,
    ) -> ResilienceResult<Response<Bytes>> {
        match self.attempt(transport, request, 1, &self.single_policy) {
            RetryableOutcome::Success(response) => Ok(response),
            RetryableOutcome::TerminalFailure(error) => Err(error),
            RetryableOutcome::RetryableFailure(FailureCause::Fault(fault)) => Err(fault.into()),
            RetryableOutcome::RetryableFailure(FailureCause::Status(response)) => {
                Err(ResilienceError::RetryExhausted {
                    client: self.client_name.clone(),
                    status: response.status().as_u16(),
                    attempts: 1,
                })
            }
        }
    }

    // One physical attempt: execute, observe, record, classify.
    fn attempt(
        &self,
        transport: &dyn HttpExecute,
        request: &HttpRequest,
        attempt: u32,
        policy: &RetryPolicy,
    ) -> RetryableOutcome {
        let started = Instant::now();
        let result = transport.execute(request);
        let elapsed = started.elapsed();

        self.observe(request, attempt, &result, elapsed);

        let outcome = classify(result, policy);
        if let Some(breaker) = &self.circuit_breaker {
            record_outcome(breaker, &outcome, elapsed);
        }
        outcome
    }

    fn observe(
        &self,
        request: &HttpRequest,
        attempt: u32,
        result: &ResilienceResult<Response<Bytes>>,
        elapsed: Duration,
    ) {
        let (status, error) = match result {
            Ok(response) => (Some(response.status().as_u16()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        self.observer.on_attempt(&AttemptObservation {
            client: self.client_name.clone(),
            method: request.method.to_string(),
            path: request.path().to_string(),
            attempt,
            status,
            error,
            elapsed,
        });
    }

    // Callers see either the original transport fault or one of the explicit
    // taxonomy types, never anything else.
    fn normalize(&self, error: ResilienceError) -> ResilienceError {
        match &error {
            ResilienceError::CircuitOpen { .. }
            | ResilienceError::RateLimited { .. }
            | ResilienceError::RetryExhausted { .. }
            | ResilienceError::Transport(_) => error,
            _ => ResilienceError::Unclassified {
                message: format!("client '{}'", self.client_name),
                source: Box::new(error),
            },
        }
    }
}

// Each physical attempt contributes one window data point; ignored fault
// kinds contribute none.
fn record_outcome(breaker: &CircuitBreaker, outcome: &RetryableOutcome, elapsed: Duration) {
    match outcome {
        RetryableOutcome::Success(_) => breaker.record_success(elapsed),
        RetryableOutcome::RetryableFailure(FailureCause::Status(_)) => {
            breaker.record_failure(elapsed)
        }
        RetryableOutcome::RetryableFailure(FailureCause::Fault(fault)) => {
            breaker.record_fault(fault.kind, elapsed)
        }
        RetryableOutcome::TerminalFailure(ResilienceError::Transport(fault)) => {
            breaker.record_fault(fault.kind, elapsed)
        }
        RetryableOutcome::TerminalFailure(_) => breaker.record_failure(elapsed),
    }
}
