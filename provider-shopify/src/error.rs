//! Error types for the Shopify provider

use thiserror::Error;

use bridge_traits::error::BridgeError;
use bridge_traits::StoreError;

/// Shopify provider errors
#[derive(Error, Debug)]
pub enum ShopifyError {
    /// The Admin API rejected the asset itself as invalid (status 400/422)
    #[error("Invalid asset request: {detail}")]
    InvalidRequest { detail: String },

    /// Any other non-success API response
    #[error("Shopify API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse an API response body
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Connector construction failed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport-level failure below the HTTP abstraction
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for Shopify provider operations
pub type Result<T> = std::result::Result<T, ShopifyError>;

impl From<ShopifyError> for StoreError {
    fn from(error: ShopifyError) -> Self {
        match error {
            ShopifyError::InvalidRequest { detail } => StoreError::InvalidRequest { detail },
            ShopifyError::ApiError { status, message } => StoreError::Remote { status, message },
            ShopifyError::ParseError(message) => StoreError::Transport(
                BridgeError::OperationFailed(format!("Response parsing failed: {}", message)),
            ),
            ShopifyError::ConfigError(message) => {
                StoreError::Transport(BridgeError::OperationFailed(message))
            }
            ShopifyError::Bridge(e) => StoreError::Transport(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ShopifyError::ApiError {
            status: 500,
            message: "Internal Server Error".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Shopify API error (status 500): Internal Server Error"
        );
    }

    #[test]
    fn test_invalid_request_maps_to_validation_store_error() {
        let error = ShopifyError::InvalidRequest {
            detail: "asset: Key must be under a theme directory".to_string(),
        };
        let store_error: StoreError = error.into();

        assert!(store_error.is_invalid_request());
    }

    #[test]
    fn test_api_error_maps_to_remote() {
        let error = ShopifyError::ApiError {
            status: 404,
            message: "Not Found".to_string(),
        };
        let store_error: StoreError = error.into();

        assert!(matches!(
            store_error,
            StoreError::Remote { status: 404, .. }
        ));
    }

    #[test]
    fn test_bridge_error_maps_to_transport() {
        let error = ShopifyError::Bridge(BridgeError::Timeout("request timed out".to_string()));
        let store_error: StoreError = error.into();

        assert!(matches!(store_error, StoreError::Transport(_)));
    }
}
