//! HTTP transport backed by reqwest.
//!
//! One attempt per call: the sync layer schedules every request against the
//! remote rate limit, so the transport must never retry on its own. Non-2xx
//! statuses come back as ordinary responses for the caller to classify.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_MAX_IDLE_PER_HOST: usize = 10;
const USER_AGENT: &str = concat!("theme-sync-core/", env!("CARGO_PKG_VERSION"));

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
    }
}

/// Map a reqwest failure onto the bridge error vocabulary.
///
/// Timeouts get their own variant so upstream classification can tell a slow
/// store from a broken one.
fn transport_error(err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout("Request timed out".to_string())
    } else if err.is_connect() {
        BridgeError::OperationFailed(format!("Connection failed: {}", err))
    } else {
        BridgeError::OperationFailed(err.to_string())
    }
}

/// [`HttpClient`] implementation for desktop targets.
///
/// Wraps a pooled [`reqwest::Client`] with rustls TLS. Construction never
/// touches the network, so a client can be built eagerly at startup.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Pooled client with the default 30-second request timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Pooled client with a caller-chosen request timeout.
    ///
    /// Individual requests can still override this via
    /// [`HttpRequest::timeout`].
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wrap an externally configured [`reqwest::Client`], for callers that
    /// need proxies or custom TLS roots.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(
            method = %request.method,
            url = %request.url,
            "dispatching HTTP request"
        );

        let mut builder = self
            .client
            .request(reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();

        // Header values that are not valid UTF-8 are dropped rather than
        // failing the whole response.
        let mut headers = HashMap::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str().to_owned(), text.to_owned());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| BridgeError::OperationFailed(err.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_verb_translates() {
        let cases = [
            (HttpMethod::Get, reqwest::Method::GET),
            (HttpMethod::Post, reqwest::Method::POST),
            (HttpMethod::Put, reqwest::Method::PUT),
            (HttpMethod::Patch, reqwest::Method::PATCH),
            (HttpMethod::Delete, reqwest::Method::DELETE),
            (HttpMethod::Head, reqwest::Method::HEAD),
        ];

        for (ours, theirs) in cases {
            assert_eq!(reqwest_method(ours), theirs);
        }
    }

    #[test]
    fn test_construction_is_offline() {
        // Building a client must not require connectivity.
        let _defaulted = ReqwestHttpClient::default();
        let _short = ReqwestHttpClient::with_timeout(Duration::from_secs(2));
        let _wrapped = ReqwestHttpClient::with_client(Client::new());
    }

    #[test]
    fn test_user_agent_names_the_project() {
        assert!(USER_AGENT.starts_with("theme-sync-core/"));
    }
}
