//! Error types for the resilient HTTP layer.
//!
//! One crate-level taxonomy: callers see either the original transport fault
//! or one of the explicit rejection/exhaustion types, never an internal
//! wrapper.

mod error;

pub use error::{FaultKind, ResilienceError, ResilienceResult, TransportFault};
