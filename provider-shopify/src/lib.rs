//! # Shopify Provider
//!
//! Implements the `ThemeStore` trait for the Shopify Admin API theme assets
//! endpoint.
//!
//! ## Overview
//!
//! This module provides:
//! - Basic-auth credentials over the injected `HttpClient`
//! - Themed and legacy published-theme asset routes
//! - Upserts carrying `value` (text) or a base64 `attachment` (binary)
//! - HTTP-status classification into the store error taxonomy

pub mod connector;
pub mod error;
pub mod types;

pub use connector::ShopifyConnector;
pub use error::{Result, ShopifyError};
