//! Named retry instance and the attempt loop.
//!
//! A `Retry` owns its resolved policy and the wait-interval function, which
//! is computed once at construction — never per attempt. The pipeline hands
//! it an attempt closure producing a [`RetryableOutcome`] per physical
//! attempt.

use crate::config::RetryPolicy;
use crate::errors::{ResilienceError, ResilienceResult};
use crate::resilience::backoff::{interval_fn, IntervalFn};
use crate::resilience::classify::{FailureCause, RetryableOutcome};
use bytes::Bytes;
use http::Response;
use std::time::Duration;

/// A named, shared retry instance.
pub struct Retry {
    name: String,
    policy: RetryPolicy,
    interval: IntervalFn,
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Retry {
    /// Creates a retry instance, selecting the backoff interval function
    /// from the policy.
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        let interval = interval_fn(&policy);
        Self {
            name: name.into(),
            policy,
            interval,
        }
    }

    /// The client name this instance is keyed by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy this instance was created with.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The wait applied after the given (1-based) failed attempt.
    pub fn interval(&self, attempt: u32) -> Duration {
        (self.interval)(attempt)
    }

    /// Drives up to `max_attempts` invocations of the attempt closure,
    /// sleeping the selected interval between retryable outcomes.
    pub fn execute<F>(&self, mut attempt_fn: F) -> ResilienceResult<Response<Bytes>>
    where
        F: FnMut(u32) -> RetryableOutcome,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match attempt_fn(attempt) {
                RetryableOutcome::Success(response) => {
                    if attempt > 1 {
                        tracing::info!(
                            retry = %self.name,
                            attempts = attempt,
                            "call succeeded after retries"
                        );
                    }
                    return Ok(response);
                }
                RetryableOutcome::TerminalFailure(error) => {
                    tracing::trace!(retry = %self.name, %error, "failure not eligible for retry");
                    return Err(error);
                }
                RetryableOutcome::RetryableFailure(cause) => {
                    if attempt >= max_attempts {
                        return self.exhausted(attempt, cause);
                    }
                    let delay = (self.interval)(attempt);
                    tracing::info!(
                        retry = %self.name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        status = cause.status(),
                        "retrying after retryable outcome"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
    }

    fn exhausted(&self, attempts: u32, cause: FailureCause) -> ResilienceResult<Response<Bytes>> {
        match cause {
            FailureCause::Fault(fault) => {
                tracing::warn!(
                    retry = %self.name,
                    attempts,
                    %fault,
                    "retries exhausted on transport fault"
                );
                Err(fault.into())
            }
            FailureCause::Status(response) => {
                let status = response.status().as_u16();
                tracing::warn!(retry = %self.name, attempts, status, "retries exhausted");
                if self.policy.fail_after_max_attempts {
                    Err(ResilienceError::RetryExhausted {
                        client: self.name.clone(),
                        status,
                        attempts,
                    })
                } else {
                    Ok(response)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportFault;
    use http::StatusCode;

    fn response(status: u16) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = StatusCode::from_u16(status).unwrap();
        response
    }

    fn retry(max_attempts: u32) -> Retry {
        Retry::new(
            "api",
            RetryPolicy {
                max_attempts,
                wait_duration: Duration::from_millis(1),
                ..Default::default()
            },
        )
    }

    #[test]
    fn first_success_short_circuits() {
        let retry = retry(3);
        let mut calls = 0;

        let result = retry.execute(|_| {
            calls += 1;
            RetryableOutcome::Success(response(200))
        });

        assert_eq!(result.unwrap().status().as_u16(), 200);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_until_success() {
        let retry = retry(4);
        let mut calls = 0;

        let result = retry.execute(|attempt| {
            calls += 1;
            if attempt < 3 {
                RetryableOutcome::RetryableFailure(FailureCause::Status(response(503)))
            } else {
                RetryableOutcome::Success(response(200))
            }
        });

        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhaustion_surfaces_the_last_status() {
        let retry = retry(3);
        let mut calls = 0;

        let result = retry.execute(|_| {
            calls += 1;
            RetryableOutcome::RetryableFailure(FailureCause::Status(response(502)))
        });

        assert_eq!(calls, 3);
        match result.unwrap_err() {
            ResilienceError::RetryExhausted {
                status, attempts, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetryExhausted, got {other}"),
        }
    }

    #[test]
    fn exhaustion_returns_the_last_response_when_not_failing() {
        let retry = Retry::new(
            "api",
            RetryPolicy {
                max_attempts: 2,
                wait_duration: Duration::from_millis(1),
                fail_after_max_attempts: false,
                ..Default::default()
            },
        );

        let result = retry.execute(|_| {
            RetryableOutcome::RetryableFailure(FailureCause::Status(response(503)))
        });

        assert_eq!(result.unwrap().status().as_u16(), 503);
    }

    #[test]
    fn terminal_failure_stops_immediately() {
        let retry = retry(5);
        let mut calls = 0;

        let result = retry.execute(|_| {
            calls += 1;
            RetryableOutcome::TerminalFailure(
                TransportFault::new(crate::errors::FaultKind::Protocol, "bad frame").into(),
            )
        });

        assert_eq!(calls, 1);
        assert!(matches!(
            result.unwrap_err(),
            ResilienceError::Transport(_)
        ));
    }

    #[test]
    fn exhaustion_on_fault_propagates_the_fault() {
        let retry = retry(2);

        let result = retry.execute(|_| {
            RetryableOutcome::RetryableFailure(FailureCause::Fault(TransportFault::timeout(
                "read timed out",
            )))
        });

        match result.unwrap_err() {
            ResilienceError::Transport(fault) => {
                assert_eq!(fault.kind, crate::errors::FaultKind::Timeout)
            }
            other => panic!("expected transport fault, got {other}"),
        }
    }
}
