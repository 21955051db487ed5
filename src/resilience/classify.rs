//! Retryability classification.
//!
//! Every physical attempt produces one [`RetryableOutcome`], consumed by a
//! single switch in the retry loop. Classification rules:
//!
//! - A configured, non-empty retryable status set is fully authoritative:
//!   a response is retryable iff its status is a member. An empty set means
//!   "any 5xx".
//! - A transport fault whose kind is in the policy's ignore set propagates
//!   immediately without consuming an attempt; a kind in the retry set is
//!   always retryable; anything else propagates verbatim.
//! - A response that is not retryable is a success at this layer, whatever
//!   its status code.

use crate::config::RetryPolicy;
use crate::errors::{ResilienceError, ResilienceResult, TransportFault};
use bytes::Bytes;
use http::{Response, StatusCode};
use std::collections::BTreeSet;

/// Tagged result of one physical attempt.
#[derive(Debug)]
pub enum RetryableOutcome {
    /// The response is returned to the caller unchanged
    Success(Response<Bytes>),
    /// The outcome is eligible for another attempt
    RetryableFailure(FailureCause),
    /// The failure propagates immediately, unretried
    TerminalFailure(ResilienceError),
}

/// What made an attempt a retryable failure.
#[derive(Debug)]
pub enum FailureCause {
    /// A response whose status matched the retryable set (or the 5xx rule)
    Status(Response<Bytes>),
    /// A transport fault matching the retry predicate
    Fault(TransportFault),
}

impl FailureCause {
    /// The status code, when the cause was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureCause::Status(response) => Some(response.status().as_u16()),
            FailureCause::Fault(_) => None,
        }
    }
}

/// Applies the status rule: membership when `configured` is non-empty,
/// otherwise any 5xx.
pub fn status_is_retryable(status: StatusCode, configured: &BTreeSet<u16>) -> bool {
    if configured.is_empty() {
        status.is_server_error()
    } else {
        configured.contains(&status.as_u16())
    }
}

/// Classifies one attempt's raw result under the given policy.
pub fn classify(
    result: ResilienceResult<Response<Bytes>>,
    policy: &RetryPolicy,
) -> RetryableOutcome {
    match result {
        Ok(response) => {
            if status_is_retryable(response.status(), &policy.retry_status) {
                RetryableOutcome::RetryableFailure(FailureCause::Status(response))
            } else {
                RetryableOutcome::Success(response)
            }
        }
        Err(ResilienceError::Transport(fault)) => {
            if policy.ignore_faults.contains(&fault.kind) {
                RetryableOutcome::TerminalFailure(ResilienceError::Transport(fault))
            } else if policy.retry_faults.contains(&fault.kind) {
                RetryableOutcome::RetryableFailure(FailureCause::Fault(fault))
            } else {
                RetryableOutcome::TerminalFailure(ResilienceError::Transport(fault))
            }
        }
        Err(other) => RetryableOutcome::TerminalFailure(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FaultKind;
    use test_case::test_case;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    fn response(code: u16) -> Response<Bytes> {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = status(code);
        response
    }

    #[test_case(500, &[] => true; "empty set retries 500")]
    #[test_case(503, &[] => true; "empty set retries 503")]
    #[test_case(404, &[] => false; "empty set keeps 404")]
    #[test_case(429, &[] => false; "empty set keeps 429")]
    #[test_case(429, &[429] => true; "explicit set retries member")]
    #[test_case(500, &[429] => false; "explicit set is authoritative over 5xx")]
    #[test_case(502, &[429, 502, 503] => true; "explicit set retries 502")]
    #[test_case(504, &[429, 502, 503] => false; "explicit set keeps unlisted 504")]
    fn status_rule(code: u16, configured: &[u16]) -> bool {
        status_is_retryable(status(code), &configured.iter().copied().collect())
    }

    #[test]
    fn non_retryable_response_is_a_success() {
        let policy = RetryPolicy::default();
        let outcome = classify(Ok(response(404)), &policy);
        match outcome {
            RetryableOutcome::Success(r) => assert_eq!(r.status().as_u16(), 404),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn ignored_fault_is_terminal_even_when_also_in_retry_set() {
        let policy = RetryPolicy {
            retry_faults: [FaultKind::Timeout].into(),
            ignore_faults: [FaultKind::Timeout].into(),
            ..Default::default()
        };
        let outcome = classify(
            Err(TransportFault::timeout("read timed out").into()),
            &policy,
        );
        assert!(matches!(
            outcome,
            RetryableOutcome::TerminalFailure(ResilienceError::Transport(_))
        ));
    }

    #[test]
    fn retry_set_fault_is_retryable_regardless_of_status_config() {
        let policy = RetryPolicy {
            retry_status: [429].into(),
            ..Default::default()
        };
        let outcome = classify(
            Err(TransportFault::connect("connection refused").into()),
            &policy,
        );
        assert!(matches!(
            outcome,
            RetryableOutcome::RetryableFailure(FailureCause::Fault(_))
        ));
    }

    #[test]
    fn unmatched_fault_propagates_verbatim() {
        let policy = RetryPolicy::default();
        let fault = TransportFault::new(FaultKind::Protocol, "bad frame");
        let outcome = classify(Err(fault.into()), &policy);
        match outcome {
            RetryableOutcome::TerminalFailure(ResilienceError::Transport(f)) => {
                assert_eq!(f.kind, FaultKind::Protocol);
            }
            other => panic!("expected terminal transport fault, got {other:?}"),
        }
    }
}
