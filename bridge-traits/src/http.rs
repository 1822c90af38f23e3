//! HTTP Client Abstraction
//!
//! Platform-neutral request/response types plus the [`HttpClient`] trait that
//! transports implement.
//!
//! Implementations are deliberately thin: one request in, one response out.
//! Retry and pacing decisions belong to the sync layer, which spaces calls to
//! stay inside the remote API's rate limit. A transport that silently retried
//! would defeat that accounting.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Request verb, restricted to the methods the theme API actually serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        })
    }
}

/// A request described in transport-neutral terms.
///
/// Built with chained setters and handed to [`HttpClient::execute`]. All
/// fields are public so transports can translate without another accessor
/// layer in between.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set a header, replacing any previous value under the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach an `Authorization: Basic ...` header built from an API key and
    /// password pair.
    pub fn basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = general_purpose::STANDARD.encode(credentials);
        self.header("Authorization", format!("Basic {}", encoded))
    }

    /// Set a raw request body. The caller is responsible for any
    /// `Content-Type` header.
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `payload` as the request body and mark it as JSON.
    pub fn json<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(payload).map_err(|err| {
            BridgeError::OperationFailed(format!("JSON body encoding failed: {}", err))
        })?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Override the transport's default timeout for this request only.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// What came back: status, headers, and the complete body.
///
/// Bodies are buffered in full. Theme assets are small enough that streaming
/// would only complicate the error paths.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Look up a header value, ignoring name case.
    ///
    /// Transport implementations differ in how they report header names
    /// (`Retry-After` vs `retry-after`), so callers should go through this
    /// instead of indexing `headers` directly.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// True for any 4xx status.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status, 400..=499)
    }

    /// True for any 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, 500..=599)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            BridgeError::OperationFailed(format!("response body is not valid JSON: {}", err))
        })
    }

    /// Decode the body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|err| {
                BridgeError::OperationFailed(format!("response body is not UTF-8: {}", err))
            })
    }
}

/// One-shot async HTTP transport.
///
/// Implementations own connection pooling, TLS, and per-request timeouts.
/// They must perform exactly one attempt per call: callers that want retries
/// schedule them explicitly so every attempt is accounted for by the rate
/// limiter. Non-2xx statuses are returned as ordinary responses, not errors,
/// because the caller decides what a 404 or 422 means.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn put_asset(client: &dyn HttpClient, url: &str, body: &serde_json::Value) -> Result<u16> {
///     let request = HttpRequest::new(HttpMethod::Put, url)
///         .basic_auth("api-key", "password")
///         .json(body)?;
///
///     let response = client.execute(request).await?;
///     Ok(response.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform the request once.
    ///
    /// # Errors
    ///
    /// Fails only on transport-level problems: the connection could not be
    /// established, TLS negotiation failed, or the request timed out.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
