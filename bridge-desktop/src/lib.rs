//! Desktop adapters for the host bridge traits.
//!
//! One crate per environment: this one targets desktop binaries (macOS,
//! Windows, Linux) and ships a single adapter, [`ReqwestHttpClient`], built
//! on `reqwest` with rustls TLS and connection pooling.
//!
//! The client is deliberately retry-free. The sync layer accounts every
//! request against the remote rate limit, so each `execute` call maps to
//! exactly one request on the wire.
//!
//! Most callers never name this crate directly: enabling the `desktop-shims`
//! feature of `core-runtime` makes its config builder fall back to this
//! client when none is injected. Constructing one by hand works too:
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use bridge_traits::HttpClient;
//! use std::sync::Arc;
//!
//! let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
//! ```

mod http;

pub use http::ReqwestHttpClient;
