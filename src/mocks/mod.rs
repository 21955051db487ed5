//! Scripted test doubles for the transport seam.

use crate::errors::{FaultKind, ResilienceError, ResilienceResult, TransportFault};
use crate::transport::{HttpExecute, HttpRequest};
use bytes::Bytes;
use http::{Response, StatusCode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

/// One scripted transport result.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    /// Respond with this status (body is the status code as text)
    Status(u16),
    /// Fail with a transport fault of this kind
    Fault(FaultKind),
    /// Fail with an arbitrary error
    Error(ResilienceError),
}

/// Transport double that replays a scripted sequence of results, then falls
/// back to a repeated step (or 200) once the sequence is drained. Counts
/// every physical execution.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<ScriptedStep>>,
    fallback: Mutex<Option<ScriptedStep>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    /// Creates an empty script (every call answers 200).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that always answers with `status`.
    pub fn always_status(status: u16) -> Self {
        let transport = Self::new();
        *transport.fallback.lock() = Some(ScriptedStep::Status(status));
        transport
    }

    /// Creates a transport that always fails with a fault of `kind`.
    pub fn always_fault(kind: FaultKind) -> Self {
        let transport = Self::new();
        *transport.fallback.lock() = Some(ScriptedStep::Fault(kind));
        transport
    }

    /// Appends a status response to the script.
    pub fn push_status(&self, status: u16) {
        self.steps.lock().push_back(ScriptedStep::Status(status));
    }

    /// Appends a transport fault to the script.
    pub fn push_fault(&self, kind: FaultKind) {
        self.steps.lock().push_back(ScriptedStep::Fault(kind));
    }

    /// Appends an arbitrary error to the script.
    pub fn push_error(&self, error: ResilienceError) {
        self.steps.lock().push_back(ScriptedStep::Error(error));
    }

    /// Number of physical executions seen so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpExecute for ScriptedTransport {
    fn execute(&self, _request: &HttpRequest) -> ResilienceResult<Response<Bytes>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .pop_front()
            .or_else(|| self.fallback.lock().clone());

        match step {
            Some(ScriptedStep::Status(code)) => Ok(response(code)),
            Some(ScriptedStep::Fault(kind)) => {
                Err(TransportFault::new(kind, "scripted fault").into())
            }
            Some(ScriptedStep::Error(error)) => Err(error),
            None => Ok(response(200)),
        }
    }
}

/// Builds a response whose body is the status code as text.
pub fn response(status: u16) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(status.to_string()));
    *response.status_mut() = StatusCode::from_u16(status).expect("valid status code");
    response
}

/// A GET request against a fixed test URL.
pub fn request() -> HttpRequest {
    HttpRequest::get(Url::parse("http://upstream.test/resource").expect("valid url"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_plays_in_order_then_falls_back() {
        let transport = ScriptedTransport::always_status(204);
        transport.push_status(503);

        let first = transport.execute(&request()).unwrap();
        assert_eq!(first.status().as_u16(), 503);
        assert_eq!(first.body(), &Bytes::from_static(b"503"));

        let second = transport.execute(&request()).unwrap();
        assert_eq!(second.status().as_u16(), 204);
        assert_eq!(transport.calls(), 2);
    }
}
