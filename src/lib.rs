//! # Theme Sync Core Workspace
//!
//! This crate is a facade over the workspace members. It exists so that the
//! whole stack can be pulled in (and feature-unified) through a single
//! dependency edge:
//!
//! - [`bridge-traits`](../bridge_traits/index.html) - platform abstraction traits
//! - [`bridge-desktop`](../bridge_desktop/index.html) - native implementations
//! - [`core-runtime`](../core_runtime/index.html) - configuration, events, logging
//! - [`core-sync`](../core_sync/index.html) - the rate-limited sync queue
//! - [`provider-shopify`](../provider_shopify/index.html) - Shopify theme asset store
//!
//! Depend on the individual member crates directly when you only need part of
//! the stack. The `desktop-shims` feature (on by default) wires the native
//! HTTP client into `core-runtime` so a configuration can be built without
//! hand-injecting platform implementations.
