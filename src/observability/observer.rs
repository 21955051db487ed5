//! Per-attempt observation events.
//!
//! The pipeline emits exactly one event per physical attempt, tagged with
//! the client name, HTTP method, and URL path. Sinks (metrics, tracing
//! backends) live outside this crate and subscribe through [`CallObserver`].

use parking_lot::Mutex;
use std::time::Duration;

/// One physical attempt, as seen by observers.
#[derive(Debug, Clone)]
pub struct AttemptObservation {
    /// Name of the decorated client
    pub client: String,
    /// HTTP method of the request
    pub method: String,
    /// URL path of the request
    pub path: String,
    /// Attempt number within the logical call, starting at 1
    pub attempt: u32,
    /// Status code, when the transport produced a response
    pub status: Option<u16>,
    /// Error text, when the attempt failed below HTTP
    pub error: Option<String>,
    /// Wall-clock duration of the attempt
    pub elapsed: Duration,
}

/// Receives one event per physical attempt.
pub trait CallObserver: Send + Sync {
    /// Called after each physical attempt completes, success or not.
    fn on_attempt(&self, observation: &AttemptObservation);
}

/// Observer that discards all events.
#[derive(Debug, Default)]
pub struct NoopCallObserver;

impl CallObserver for NoopCallObserver {
    fn on_attempt(&self, _observation: &AttemptObservation) {}
}

/// Observer that records events in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct InMemoryCallObserver {
    observations: Mutex<Vec<AttemptObservation>>,
}

impl InMemoryCallObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn observations(&self) -> Vec<AttemptObservation> {
        self.observations.lock().clone()
    }

    /// Number of recorded events.
    pub fn count(&self) -> usize {
        self.observations.lock().len()
    }
}

impl CallObserver for InMemoryCallObserver {
    fn on_attempt(&self, observation: &AttemptObservation) {
        self.observations.lock().push(observation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_observer_records_events() {
        let observer = InMemoryCallObserver::new();
        observer.on_attempt(&AttemptObservation {
            client: "api".to_string(),
            method: "GET".to_string(),
            path: "/orders".to_string(),
            attempt: 1,
            status: Some(200),
            error: None,
            elapsed: Duration::from_millis(12),
        });

        assert_eq!(observer.count(), 1);
        let events = observer.observations();
        assert_eq!(events[0].client, "api");
        assert_eq!(events[0].status, Some(200));
    }
}
