//! Theme Store Abstraction
//!
//! Provides the backend-agnostic data model for theme assets and the
//! [`ThemeStore`] trait that concrete API connectors implement.
//!
//! The store surface is intentionally small: a theme asset is either
//! created/updated (`update_asset`) or removed (`delete_asset`), always
//! addressed by its [`AssetKey`] within a [`ThemeTarget`]. Everything else
//! (scheduling, throttling, retries) lives above this trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remote resource key for a theme asset.
///
/// Keys are URI-encoded relative paths using forward slashes, e.g.
/// `assets/site.css` or `templates/product.liquid`. They are unique within a
/// theme and stable across platforms regardless of the local path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for AssetKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Opaque theme identifier.
///
/// Kept as a string: the backend assigns ids and validates their shape, the
/// core only threads them into request routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeId(String);

impl ThemeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ThemeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ThemeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Which theme a store call addresses.
///
/// Most deployments pin a concrete theme id. `Published` addresses whatever
/// theme is currently live via the backend's legacy no-id route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeTarget {
    /// The currently published theme (legacy route without a theme id).
    Published,
    /// A specific theme addressed by id.
    Theme(ThemeId),
}

impl ThemeTarget {
    /// Theme id when targeting a specific theme, `None` for the published one.
    pub fn theme_id(&self) -> Option<&ThemeId> {
        match self {
            Self::Published => None,
            Self::Theme(id) => Some(id),
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for ThemeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published => write!(f, "published"),
            Self::Theme(id) => write!(f, "{}", id),
        }
    }
}

/// Asset contents, pre-classified for the wire.
///
/// The remote API stores text assets verbatim (`value`) and binary assets
/// base64-encoded (`attachment`); exactly one of the two is sent per asset.
/// Classification happens once, up front, via [`AssetContent::from_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetContent {
    /// Valid UTF-8, sent as the plain `value` field.
    Text(String),
    /// Any other byte sequence, base64-encoded into the `attachment` field.
    Binary(Bytes),
}

impl AssetContent {
    /// Classify raw file bytes.
    ///
    /// UTF-8 validity is the exact criterion: the text form must survive a
    /// JSON string field, so anything that decodes cleanly is text and
    /// everything else is an attachment. No content sniffing.
    pub fn from_bytes(bytes: Bytes) -> Self {
        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Self::Text(text),
            Err(_) => Self::Binary(bytes),
        }
    }

    /// Content size in bytes (before any base64 expansion).
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    /// Classification label for structured logging.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}

/// An asset as handed to the store for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub key: AssetKey,
    pub content: AssetContent,
}

impl RemoteAsset {
    pub fn new(key: AssetKey, content: AssetContent) -> Self {
        Self { key, content }
    }

    /// Convenience constructor for text assets.
    pub fn text(key: impl Into<AssetKey>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: AssetContent::Text(value.into()),
        }
    }

    /// Convenience constructor for binary assets.
    pub fn binary(key: impl Into<AssetKey>, bytes: Bytes) -> Self {
        Self {
            key: key.into(),
            content: AssetContent::Binary(bytes),
        }
    }
}

/// What the remote reports back after a successful update.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetReceipt {
    /// Key echoed back by the remote.
    pub key: AssetKey,
    /// Stored size in bytes, when reported.
    pub size: Option<u64>,
    /// Remote modification timestamp, when reported.
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssetReceipt {
    pub fn new(key: AssetKey) -> Self {
        Self {
            key,
            size: None,
            updated_at: None,
        }
    }
}

/// Store operation failures, split by how callers must react.
///
/// The split matters: `InvalidRequest` means the remote understood the call
/// and rejected the asset itself (bad key, disallowed directory), so the
/// same request will fail again and must never be retried. Everything else
/// is transient or unexplained and may be retried under an explicit policy.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The remote rejected the request as structurally invalid.
    #[error("invalid asset request: {detail}")]
    InvalidRequest { detail: String },

    /// The remote answered with a non-success status that is not a
    /// validation rejection.
    #[error("remote call failed (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    /// The call never produced a remote response.
    #[error("transport failure: {0}")]
    Transport(#[from] crate::error::BridgeError),
}

impl StoreError {
    /// True when the remote itself rejected the request as invalid.
    ///
    /// Deterministic failures: retrying cannot succeed.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Async theme asset store.
///
/// Implemented by concrete API connectors. Implementations perform exactly
/// one remote call per method invocation and map failures into the
/// [`StoreError`] classification; they do not retry, log outcomes, or pace
/// calls. The sync layer owns all of that.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::store::{RemoteAsset, ThemeStore, ThemeTarget};
///
/// async fn push(store: &dyn ThemeStore, target: &ThemeTarget, asset: RemoteAsset) {
///     match store.update_asset(target, &asset).await {
///         Ok(receipt) => println!("stored {}", receipt.key),
///         Err(err) if err.is_invalid_request() => println!("rejected: {}", err),
///         Err(err) => println!("failed: {}", err),
///     }
/// }
/// ```
#[async_trait]
pub trait ThemeStore: Send + Sync {
    /// Create or replace one asset in the target theme.
    async fn update_asset(
        &self,
        target: &ThemeTarget,
        asset: &RemoteAsset,
    ) -> StoreResult<AssetReceipt>;

    /// Remove one asset from the target theme.
    ///
    /// Implementations should treat an already-absent key the way the
    /// backend reports it; the sync layer does not special-case missing
    /// assets.
    async fn delete_asset(&self, target: &ThemeTarget, key: &AssetKey) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_key_display_and_serde() {
        let key = AssetKey::new("assets/site.css");
        assert_eq!(key.as_str(), "assets/site.css");
        assert_eq!(key.to_string(), "assets/site.css");

        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""assets/site.css""#);

        let back: AssetKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_theme_target_id_access() {
        let target = ThemeTarget::Theme(ThemeId::new("12345"));
        assert_eq!(target.theme_id().map(ThemeId::as_str), Some("12345"));
        assert!(!target.is_published());
        assert_eq!(target.to_string(), "12345");

        let published = ThemeTarget::Published;
        assert!(published.theme_id().is_none());
        assert!(published.is_published());
        assert_eq!(published.to_string(), "published");
    }

    #[test]
    fn test_content_classification_text() {
        let content = AssetContent::from_bytes(Bytes::from("body { color: red; }"));
        assert!(!content.is_binary());
        assert_eq!(content.kind_str(), "text");
        assert_eq!(content.len(), 20);
    }

    #[test]
    fn test_content_classification_binary() {
        // 0xFF 0xFE is never valid UTF-8
        let content = AssetContent::from_bytes(Bytes::from_static(&[0xFF, 0xFE, 0x00, 0x01]));
        assert!(content.is_binary());
        assert_eq!(content.kind_str(), "binary");
        assert_eq!(content.len(), 4);
    }

    #[test]
    fn test_content_classification_is_deterministic() {
        let bytes = Bytes::from_static(&[0xE2, 0x82, 0xAC]); // "€"
        let first = AssetContent::from_bytes(bytes.clone());
        let second = AssetContent::from_bytes(bytes);
        assert_eq!(first, second);
        assert_eq!(first, AssetContent::Text("€".to_string()));
    }

    #[test]
    fn test_store_error_classification() {
        let invalid = StoreError::InvalidRequest {
            detail: "asset key must not escape the theme root".to_string(),
        };
        assert!(invalid.is_invalid_request());

        let remote = StoreError::Remote {
            status: 500,
            message: "internal server error".to_string(),
        };
        assert!(!remote.is_invalid_request());

        let transport =
            StoreError::Transport(crate::error::BridgeError::Timeout("30s elapsed".to_string()));
        assert!(!transport.is_invalid_request());
    }

    #[test]
    fn test_remote_asset_constructors() {
        let text = RemoteAsset::text("snippets/header.liquid", "{% comment %}hi{% endcomment %}");
        assert_eq!(text.key.as_str(), "snippets/header.liquid");
        assert!(!text.content.is_binary());

        let binary = RemoteAsset::binary("assets/logo.png", Bytes::from_static(&[0x89, 0x50]));
        assert!(binary.content.is_binary());
    }
}
