//! Observability seams: per-attempt observation events and logging setup.

mod logging;
mod observer;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use observer::{AttemptObservation, CallObserver, InMemoryCallObserver, NoopCallObserver};
