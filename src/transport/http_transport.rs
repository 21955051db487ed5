//! Blocking HTTP transport implementations.

use crate::errors::ResilienceResult;
use bytes::Bytes;
use http::{HeaderMap, Method, Response};
use std::time::Duration;
use url::Url;

/// A single blocking HTTP execution.
///
/// Implementations return `Ok` for every HTTP status — classifying error
/// statuses is the pipeline's job, not the transport's — and an error only
/// for I/O-level faults.
pub trait HttpExecute: Send + Sync {
    /// Executes the request once and returns the raw response.
    fn execute(&self, request: &HttpRequest) -> ResilienceResult<Response<Bytes>>;
}

/// An outbound request, re-executable across physical attempts.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Fully resolved target URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Optional request body
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a POST request with a body.
    pub fn post(url: Url, body: Bytes) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.body = Some(body);
        request
    }

    /// Replaces the headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The URL path, as tagged on observation events.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Blocking transport backed by a pooled `reqwest` client.
pub struct BlockingReqwestTransport {
    client: reqwest::blocking::Client,
}

impl BlockingReqwestTransport {
    /// Creates a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> ResilienceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::errors::ResilienceError::Configuration {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpExecute for BlockingReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> ResilienceResult<Response<Bytes>> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.to_vec());
        }

        let raw = builder.send()?;
        let status = raw.status();
        let headers = raw.headers().clone();
        let body = raw.bytes()?;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
