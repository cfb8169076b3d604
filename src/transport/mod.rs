//! Transport layer for calling the service under test
//!
//! The fuzzer only needs one operation: send a request, get back a status,
//! headers and body, or a transport error. Implementations:
//! - `http` - real HTTP calls through reqwest
//! - `mock` - scripted responses for tests

pub mod http;
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::contract::HttpMethod;

pub use http::ReqwestTransport;
pub use mock::MockTransport;

/// Errors raised by a transport call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("timeout after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Outgoing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the transport's base URL
    pub path: String,
    /// Query parameters appended to the URL
    pub query: Vec<(String, String)>,
    /// Header name/value pairs in send order; names may repeat
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, case-insensitive
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response received from the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub elapsed_ms: u64,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            elapsed_ms: 0,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP transport abstraction
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request, giving up after `timeout`
    async fn call(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;

    /// Get transport type name for logging/debugging
    fn transport_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(HttpMethod::Get, "/")
            .with_header("X-Trace", "a")
            .with_header("x-trace", "b");
        assert_eq!(request.header("X-TRACE"), Some("a"));
        assert_eq!(request.header_values("x-trace").count(), 2);
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn header_value_outlives_the_lookup_name() {
        let request = HttpRequest::new(HttpMethod::Get, "/").with_header("Accept", "text/plain");
        let value = {
            let name = String::from("accept");
            request.header(&name)
        };
        assert_eq!(value, Some("text/plain"));
    }

    #[test]
    fn timeout_error_mentions_timeout() {
        let err = TransportError::Timeout(Duration::from_millis(250));
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timeout after 250ms");
    }
}
