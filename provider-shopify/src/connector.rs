//! Shopify Admin API connector
//!
//! Implements the `ThemeStore` trait over the theme assets endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::{
    AssetKey, AssetReceipt, RemoteAsset, StoreError, StoreResult, ThemeStore, ThemeTarget,
};
use core_runtime::config::CoreConfig;
use tracing::{debug, instrument};

use crate::error::{Result, ShopifyError};
use crate::types::{AssetEnvelope, AssetResponse, ErrorBody};

/// Per-request timeout. Theme asset uploads can be large and the Admin API
/// slows down under throttling pressure, so this stays generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Shopify Admin API connector
///
/// Implements `ThemeStore` for the theme assets endpoint.
///
/// # Features
///
/// - Basic-auth credentials on every request
/// - Themed route (`/admin/themes/{id}/assets.json`) and the legacy
///   published-theme route (`/admin/assets.json`)
/// - Text assets sent as `value`, binary assets as base64 `attachment`
/// - Statuses 400/422 classified as validation rejections, everything
///   else surfaced as a remote failure
///
/// The connector makes exactly one HTTP call per store operation; pacing
/// and retries are the sync queue's job.
pub struct ShopifyConnector {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    password: String,
    host: String,
}

impl ShopifyConnector {
    /// Create a connector over an HTTP client with private-app credentials.
    ///
    /// `host` is a bare domain like `store-name.myshopify.com`.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            password: password.into(),
            host: host.into(),
        }
    }

    /// Build a connector from a validated config.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let http_client = config
            .http_client
            .clone()
            .ok_or_else(|| ShopifyError::ConfigError("config carries no HTTP client".to_string()))?;

        Ok(Self::new(
            http_client,
            config.api_key.clone(),
            config.password.clone(),
            config.host.clone(),
        ))
    }

    /// The store host this connector talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn assets_url(&self, target: &ThemeTarget) -> String {
        match target.theme_id() {
            Some(id) => format!("https://{}/admin/themes/{}/assets.json", self.host, id),
            None => format!("https://{}/admin/assets.json", self.host),
        }
    }

    fn delete_url(&self, target: &ThemeTarget, key: &AssetKey) -> String {
        // The key goes into the `asset[key]` query parameter; the server
        // decodes the value once, so it is percent-encoded wholesale here.
        format!(
            "{}?asset%5Bkey%5D={}",
            self.assets_url(target),
            urlencoding::encode(key.as_str())
        )
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            return Ok(response);
        }

        Err(Self::classify_failure(&response))
    }

    /// Map a non-success response onto the error taxonomy.
    ///
    /// Statuses 400 and 422 are validation rejections of the asset itself;
    /// everything else (auth failures, 404s, throttling, server errors)
    /// stays unexplained and may be retried by the caller's policy.
    fn classify_failure(response: &HttpResponse) -> ShopifyError {
        let message = serde_json::from_slice::<ErrorBody>(&response.body)
            .map(|body| body.errors.to_message())
            .unwrap_or_else(|_| String::from_utf8_lossy(&response.body).to_string());

        match response.status {
            400 | 422 => ShopifyError::InvalidRequest { detail: message },
            status => ShopifyError::ApiError { status, message },
        }
    }
}

#[async_trait]
impl ThemeStore for ShopifyConnector {
    #[instrument(skip(self, asset), fields(key = %asset.key))]
    async fn update_asset(
        &self,
        target: &ThemeTarget,
        asset: &RemoteAsset,
    ) -> StoreResult<AssetReceipt> {
        let url = self.assets_url(target);
        debug!(url = %url, kind = asset.content.kind_str(), "Submitting asset update");

        let envelope = AssetEnvelope::from_asset(asset);
        let request = HttpRequest::new(HttpMethod::Put, url)
            .basic_auth(&self.api_key, &self.password)
            .header("Accept", "application/json")
            .json(&envelope)?
            .timeout(REQUEST_TIMEOUT);

        let response = self.send(request).await?;

        let parsed: AssetResponse = serde_json::from_slice(&response.body).map_err(|e| {
            StoreError::from(ShopifyError::ParseError(format!("asset response: {}", e)))
        })?;

        Ok(parsed.asset.into_receipt())
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn delete_asset(&self, target: &ThemeTarget, key: &AssetKey) -> StoreResult<()> {
        let url = self.delete_url(target, key);
        debug!(url = %url, "Submitting asset removal");

        let request = HttpRequest::new(HttpMethod::Delete, url)
            .basic_auth(&self.api_key, &self.password)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        self.send(request).await?;

        Ok(())
    }
}

impl std::fmt::Debug for ShopifyConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConnector")
            .field("host", &self.host)
            .field("api_key", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::AssetContent;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(
                &self,
                request: HttpRequest,
            ) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn connector(http: MockHttpClient) -> ShopifyConnector {
        ShopifyConnector::new(
            Arc::new(http),
            "test-key",
            "test-password",
            "store-name.myshopify.com",
        )
    }

    fn themed() -> ThemeTarget {
        ThemeTarget::Theme("148460".into())
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn receipt_body() -> &'static str {
        r#"{"asset": {"key": "assets/site.css", "size": 7, "updated_at": "2024-01-15T09:30:00-05:00"}}"#
    }

    #[tokio::test]
    async fn test_update_asset_builds_put_with_auth_and_envelope() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Put);
            assert_eq!(
                req.url,
                "https://store-name.myshopify.com/admin/themes/148460/assets.json"
            );
            assert_eq!(req.timeout, Some(Duration::from_secs(120)));

            // base64("test-key:test-password")
            let auth = req.headers.get("Authorization").unwrap();
            assert!(auth.starts_with("Basic "));

            let body: serde_json::Value =
                serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["asset"]["key"], "assets/site.css");
            assert_eq!(body["asset"]["value"], "body {}");
            assert!(body["asset"].get("attachment").is_none());

            Ok(response(200, receipt_body()))
        });

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        let receipt = connector.update_asset(&themed(), &asset).await.unwrap();

        assert_eq!(receipt.key.as_str(), "assets/site.css");
        assert_eq!(receipt.size, Some(7));
        assert!(receipt.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_binary_asset_sends_base64_attachment() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            let body: serde_json::Value =
                serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["asset"]["attachment"], "/9j/");
            assert!(body["asset"].get("value").is_none());

            Ok(response(
                200,
                r#"{"asset": {"key": "assets/logo.png", "size": 3}}"#,
            ))
        });

        let connector = connector(mock_http);
        let asset = RemoteAsset::binary("assets/logo.png", Bytes::from_static(&[0xFF, 0xD8, 0xFF]));
        let receipt = connector.update_asset(&themed(), &asset).await.unwrap();

        assert_eq!(receipt.size, Some(3));
        assert!(receipt.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_published_theme_uses_legacy_route() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://store-name.myshopify.com/admin/assets.json");
            Ok(response(200, receipt_body()))
        });

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        connector
            .update_asset(&ThemeTarget::Published, &asset)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_builds_query_with_encoded_key() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Delete);
            assert_eq!(
                req.url,
                "https://store-name.myshopify.com/admin/themes/148460/assets.json\
                 ?asset%5Bkey%5D=snippets%2Fold.liquid"
            );
            assert!(req.body.is_none());

            Ok(response(200, r#"{"message": "assets/old.liquid was deleted"}"#))
        });

        let connector = connector(mock_http);
        connector
            .delete_asset(&themed(), &AssetKey::new("snippets/old.liquid"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_validation_status_maps_to_invalid_request() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|_| {
            Ok(response(
                422,
                r#"{"errors": {"asset": ["Key must be under a theme directory"]}}"#,
            ))
        });

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("bad/site.css", "body {}");
        let err = connector.update_asset(&themed(), &asset).await.unwrap_err();

        assert!(err.is_invalid_request());
        assert!(err.to_string().contains("theme directory"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_remote() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(500, r#"{"errors": "Internal Server Error"}"#)));

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        let err = connector.update_asset(&themed(), &asset).await.unwrap_err();

        match err {
            StoreError::Remote { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_is_not_a_validation_rejection() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, r#"{"errors": "Not Found"}"#)));

        let connector = connector(mock_http);
        let err = connector
            .delete_asset(&themed(), &AssetKey::new("snippets/gone.liquid"))
            .await
            .unwrap_err();

        assert!(!err.is_invalid_request());
        assert!(matches!(err, StoreError::Remote { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_passes_through() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("connect timed out".to_string())));

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        let err = connector.update_asset(&themed(), &asset).await.unwrap_err();

        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[tokio::test]
    async fn test_unparseable_success_body_is_an_error() {
        let mut mock_http = MockHttpClient::new();

        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, "not json")));

        let connector = connector(mock_http);
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        let err = connector.update_asset(&themed(), &asset).await.unwrap_err();

        assert!(matches!(err, StoreError::Transport(_)));
    }

    #[test]
    fn test_from_config_requires_http_client() {
        let config = CoreConfig {
            api_key: "key".to_string(),
            password: "password".to_string(),
            host: "store-name.myshopify.com".to_string(),
            theme: themed(),
            base_path: None,
            base_delay: Duration::ZERO,
            burst_capacity: 40,
            http_client: None,
            notifier: None,
        };

        let err = ShopifyConnector::from_config(&config).unwrap_err();
        assert!(matches!(err, ShopifyError::ConfigError(_)));
    }

    #[test]
    fn test_from_config_takes_host_and_credentials() {
        let config = CoreConfig {
            api_key: "key".to_string(),
            password: "password".to_string(),
            host: "store-name.myshopify.com".to_string(),
            theme: themed(),
            base_path: None,
            base_delay: Duration::ZERO,
            burst_capacity: 40,
            http_client: Some(Arc::new(MockHttpClient::new())),
            notifier: None,
        };

        let connector = ShopifyConnector::from_config(&config).unwrap();
        assert_eq!(connector.host(), "store-name.myshopify.com");
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let connector = connector(MockHttpClient::new());
        let rendered = format!("{:?}", connector);

        assert!(rendered.contains("store-name.myshopify.com"));
        assert!(!rendered.contains("test-key"));
        assert!(!rendered.contains("test-password"));
    }
}
