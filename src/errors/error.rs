//! Error taxonomy for decorated HTTP calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for operations in this crate.
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Main error type for decorated HTTP calls.
///
/// Rejections from the resilience layer itself (`CircuitOpen`, `RateLimited`)
/// are distinct from failures of the remote call (`RetryExhausted`,
/// `Transport`) so callers can tell "the layer refused" apart from "the
/// upstream failed".
#[derive(Error, Debug, Clone)]
pub enum ResilienceError {
    /// Invalid configuration (out-of-range field, unresolvable policy)
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the offending field or value
        message: String,
    },

    /// The circuit breaker for this client is OPEN and refused the call
    /// before any attempt was made. Recovery is governed by the breaker's
    /// own open-state timer, not by retrying.
    #[error("circuit breaker '{client}' is open, call not permitted")]
    CircuitOpen {
        /// Client name the breaker is keyed by
        client: String,
    },

    /// The rate limiter could not grant a permit within its acquisition
    /// timeout. Never retried by this layer.
    #[error("rate limiter '{client}' denied a permit within {timeout:?}")]
    RateLimited {
        /// Client name the limiter is keyed by
        client: String,
        /// Acquisition timeout that elapsed
        timeout: Duration,
    },

    /// Every physical attempt produced a retryable outcome; the last
    /// attempt's status code is surfaced.
    #[error("retries exhausted for '{client}' after {attempts} attempt(s), last status {status}")]
    RetryExhausted {
        /// Client name the retry instance is keyed by
        client: String,
        /// Status code of the final attempt
        status: u16,
        /// Number of physical attempts made
        attempts: u32,
    },

    /// An I/O-level fault from the transport, propagated verbatim.
    #[error(transparent)]
    Transport(#[from] TransportFault),

    /// Any other failure, wrapped with the original as cause.
    #[error("resilient call failed: {message}")]
    Unclassified {
        /// Short description of where the failure escaped from
        message: String,
        /// The original failure
        #[source]
        source: Box<ResilienceError>,
    },
}

impl ResilienceError {
    /// True when this error is a rejection issued by the resilience layer
    /// itself rather than a failure of the remote call.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::CircuitOpen { .. } | ResilienceError::RateLimited { .. }
        )
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResilienceError::RetryExhausted { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Coarse classification of transport-level faults.
///
/// Stands in for the exception-class lists of JVM-style clients: retry,
/// ignore, and record predicates in the policies are sets of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The request or connection timed out
    Timeout,
    /// The connection could not be established
    Connect,
    /// The connection was reset or closed mid-exchange
    Reset,
    /// Malformed response, TLS failure, or any other protocol-level fault
    Protocol,
}

/// An I/O-level fault raised by the HTTP transport.
#[derive(Error, Debug, Clone)]
#[error("{kind:?} fault: {message}")]
pub struct TransportFault {
    /// Which kind of fault occurred
    pub kind: FaultKind,
    /// Human-readable description from the underlying client
    pub message: String,
}

impl TransportFault {
    /// Creates a fault of the given kind.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a timeout fault.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, message)
    }

    /// Shorthand for a connection fault.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Connect, message)
    }
}

impl From<reqwest::Error> for TransportFault {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFault::new(FaultKind::Timeout, format!("request timed out: {err}"))
        } else if err.is_connect() {
            TransportFault::new(FaultKind::Connect, format!("connection failed: {err}"))
        } else {
            TransportFault::new(FaultKind::Protocol, err.to_string())
        }
    }
}

impl From<reqwest::Error> for ResilienceError {
    fn from(err: reqwest::Error) -> Self {
        ResilienceError::Transport(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_distinguishable() {
        let open = ResilienceError::CircuitOpen {
            client: "api".to_string(),
        };
        assert!(open.is_rejection());

        let limited = ResilienceError::RateLimited {
            client: "api".to_string(),
            timeout: Duration::from_millis(500),
        };
        assert!(limited.is_rejection());

        let exhausted = ResilienceError::RetryExhausted {
            client: "api".to_string(),
            status: 503,
            attempts: 3,
        };
        assert!(!exhausted.is_rejection());
        assert_eq!(exhausted.status(), Some(503));
    }

    #[test]
    fn transport_fault_displays_verbatim() {
        let err: ResilienceError = TransportFault::timeout("read timed out").into();
        assert_eq!(err.to_string(), "Timeout fault: read timed out");
    }

    #[test]
    fn unclassified_keeps_cause() {
        use std::error::Error as _;

        let cause = ResilienceError::Configuration {
            message: "bad".to_string(),
        };
        let wrapped = ResilienceError::Unclassified {
            message: "interceptor".to_string(),
            source: Box::new(cause),
        };
        assert!(wrapped.source().is_some());
    }

    #[test]
    fn fault_kind_deserializes_snake_case() {
        let kind: FaultKind = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(kind, FaultKind::Timeout);
    }
}
