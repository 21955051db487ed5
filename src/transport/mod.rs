//! HTTP transport seam.
//!
//! The decoration pipeline consumes the transport as an opaque blocking
//! `execute(request) -> response` primitive; pooling, TLS, and socket tuning
//! belong to whatever sits behind the [`HttpExecute`] trait.

mod http_transport;

pub use http_transport::{BlockingReqwestTransport, HttpExecute, HttpRequest};
