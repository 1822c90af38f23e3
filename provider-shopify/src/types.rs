//! Shopify Admin API wire types
//!
//! Serde structures for the theme assets endpoint. An upsert sends exactly
//! one of `value` / `attachment` per asset; error bodies come back in two
//! shapes depending on the endpoint, both flattened here.

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};
use bridge_traits::{AssetContent, AssetKey, AssetReceipt, RemoteAsset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outgoing asset payload.
///
/// `value` carries text verbatim; `attachment` carries base64-encoded
/// binary content. Exactly one of the two is set.
#[derive(Debug, Clone, Serialize)]
pub struct AssetPayload<'a> {
    pub key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// `PUT .../assets.json` body envelope.
#[derive(Debug, Serialize)]
pub struct AssetEnvelope<'a> {
    pub asset: AssetPayload<'a>,
}

impl<'a> AssetEnvelope<'a> {
    /// Wrap an asset for the wire, base64-encoding binary content.
    pub fn from_asset(asset: &'a RemoteAsset) -> Self {
        let (value, attachment) = match &asset.content {
            AssetContent::Text(text) => (Some(text.as_str()), None),
            AssetContent::Binary(bytes) => (None, Some(general_purpose::STANDARD.encode(bytes))),
        };

        Self {
            asset: AssetPayload {
                key: asset.key.as_str(),
                value,
                attachment,
            },
        }
    }
}

/// Response envelope for a stored asset.
#[derive(Debug, Deserialize)]
pub struct AssetResponse {
    pub asset: StoredAsset,
}

/// Asset resource as the Admin API reports it back.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredAsset {
    pub key: String,

    #[serde(default)]
    pub size: Option<u64>,

    /// RFC 3339 with offset, e.g. `2024-01-15T09:30:00-05:00`
    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub public_url: Option<String>,
}

impl StoredAsset {
    /// Collapse the wire asset into a receipt, parsing the timestamp when
    /// present. An unparseable timestamp degrades to `None` rather than
    /// failing a call that already succeeded.
    pub fn into_receipt(self) -> AssetReceipt {
        let updated_at = self.updated_at.as_deref().and_then(Self::parse_timestamp);

        AssetReceipt {
            key: AssetKey::new(self.key),
            size: self.size,
            updated_at,
        }
    }

    fn parse_timestamp(rfc3339: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(rfc3339)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Error body: `{"errors": ...}` where the payload is either a bare message
/// or a map of field names to message lists.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub errors: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(BTreeMap<String, Vec<String>>),
}

impl ErrorDetail {
    /// Flatten into a single log-friendly line.
    pub fn to_message(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Fields(fields) => fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_text_asset_serializes_value() {
        let asset = RemoteAsset::text("assets/site.css", "body {}");
        let envelope = AssetEnvelope::from_asset(&asset);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["asset"]["key"], "assets/site.css");
        assert_eq!(json["asset"]["value"], "body {}");
        assert!(json["asset"].get("attachment").is_none());
    }

    #[test]
    fn test_binary_asset_serializes_attachment() {
        let asset = RemoteAsset::binary(
            "assets/logo.png",
            Bytes::from_static(&[0xFF, 0xD8, 0xFF]),
        );
        let envelope = AssetEnvelope::from_asset(&asset);
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["asset"]["attachment"], "/9j/");
        assert!(json["asset"].get("value").is_none());
    }

    #[test]
    fn test_asset_response_parses_into_receipt() {
        let body = r#"{
            "asset": {
                "key": "assets/site.css",
                "public_url": "https://cdn.shopify.com/s/files/1/assets/site.css",
                "content_type": "text/css",
                "size": 1024,
                "theme_id": 148460,
                "updated_at": "2024-01-15T09:30:00-05:00"
            }
        }"#;

        let response: AssetResponse = serde_json::from_str(body).unwrap();
        let receipt = response.asset.into_receipt();

        assert_eq!(receipt.key.as_str(), "assets/site.css");
        assert_eq!(receipt.size, Some(1024));
        // -05:00 offset normalized to UTC
        let updated_at = receipt.updated_at.unwrap();
        assert_eq!(updated_at.to_rfc3339(), "2024-01-15T14:30:00+00:00");
    }

    #[test]
    fn test_unparseable_timestamp_degrades_to_none() {
        let stored = StoredAsset {
            key: "assets/site.css".to_string(),
            size: Some(10),
            updated_at: Some("yesterday".to_string()),
            content_type: None,
            public_url: None,
        };

        let receipt = stored.into_receipt();
        assert_eq!(receipt.size, Some(10));
        assert!(receipt.updated_at.is_none());
    }

    #[test]
    fn test_error_body_bare_message_form() {
        let body: ErrorBody = serde_json::from_str(r#"{"errors": "Not Found"}"#).unwrap();
        assert_eq!(body.errors.to_message(), "Not Found");
    }

    #[test]
    fn test_error_body_field_map_form() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"errors": {"asset": ["Key must be under a theme directory", "Is empty"]}}"#,
        )
        .unwrap();

        assert_eq!(
            body.errors.to_message(),
            "asset: Key must be under a theme directory, Is empty"
        );
    }
}
