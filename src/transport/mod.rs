//! Pluggable HTTP transport
//!
//! The dispatch engine is transport-agnostic: it hands a fully
//! qualified URL and an opaque [`RequestSpec`] to an [`HttpTransport`]
//! and gets back status, headers, and body. The production
//! implementation sits on `reqwest`; tests may substitute anything
//! that implements the trait.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, IntoHeaderName, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the wire layer itself.
///
/// An HTTP response with an unwelcome status is not a transport error;
/// callers inspect [`TransportResponse::status`] for that.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("request timeout")]
    Timeout,

    /// Request could not be constructed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response body decoding error
    #[error("decoding error: {0}")]
    Decode(String),
}

// ============================================================================
// Request Spec
// ============================================================================

/// Description of an HTTP request, opaque to the dispatch engine
/// except for session-cookie header injection.
///
/// The `path` is relative; the engine prepends `http://<host>` for the
/// instance each attempt targets.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestSpec {
    /// Create a spec with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Shorthand for a GET spec.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST spec.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a header; silently skipped if the value is not a legal
    /// header value.
    pub fn with_header(mut self, name: impl IntoHeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Attach a raw body with its content type.
    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: &str) -> Self {
        self.body = Some(body.into());
        self.with_header(CONTENT_TYPE, content_type)
    }

    /// Attach an `application/x-www-form-urlencoded` body.
    pub fn with_form(self, pairs: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.with_body(encoded, "application/x-www-form-urlencoded")
    }
}

// ============================================================================
// Transport Response
// ============================================================================

/// Status, headers, and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Decode` if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TransportError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Body deserialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Decode` if the body is not valid JSON
    /// for the target type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Capability to execute one HTTP exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute `spec` against `url` and return the settled response.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] only for wire-level failures;
    /// any HTTP response, whatever its status, resolves successfully.
    async fn execute(
        &self,
        url: &str,
        spec: &RequestSpec,
    ) -> Result<TransportResponse, TransportError>;
}

// ============================================================================
// Reqwest Transport
// ============================================================================

/// Production transport on a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        url: &str,
        spec: &RequestSpec,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self
            .client
            .request(spec.method.clone(), url)
            .headers(spec.headers.clone());

        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
