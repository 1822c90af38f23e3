//! # Host Bridge Traits
//!
//! Contracts between the sync engine and everything outside it.
//!
//! The engine itself never opens a socket or talks to a desktop shell. It
//! works entirely through the traits in this crate, and each environment
//! (desktop binary, CI runner, test harness) supplies its own adapters:
//!
//! - [`HttpClient`](http::HttpClient) - async HTTP transport with TLS.
//!   Exactly one attempt per call, so the sync layer's rate accounting holds.
//! - [`ThemeStore`](store::ThemeStore) - asset upload and removal against a
//!   remote theme, with failures split into invalid-request vs. everything
//!   else.
//! - [`Notifier`](notify::Notifier) - optional desktop notification surface
//!   for per-file outcomes.
//!
//! A missing adapter is a configuration error, reported when the runtime is
//! assembled rather than at first use.
//!
//! ## Two error types, on purpose
//!
//! Transport traits use [`BridgeError`](error::BridgeError).
//! [`ThemeStore`](store::ThemeStore) has its own
//! [`StoreError`](store::StoreError) because the invalid-request / other
//! split decides whether an operation gets retried, and that decision belongs
//! to the trait contract, not to any one implementation. Adapters convert
//! platform errors into these types and keep credentials out of the messages.
//!
//! All traits carry `Send + Sync` bounds so adapters can be shared across
//! async tasks.
//!
//! ## Test doubles
//!
//! Every trait here is object-safe so tests can script behavior without a
//! network. The sync engine's own tests drive stores like this one:
//!
//! ```ignore
//! struct ScriptedStore {
//!     responses: Mutex<VecDeque<StoreResult<AssetReceipt>>>,
//! }
//!
//! #[async_trait]
//! impl ThemeStore for ScriptedStore {
//!     async fn update_asset(
//!         &self,
//!         _target: &ThemeTarget,
//!         _asset: &RemoteAsset,
//!     ) -> StoreResult<AssetReceipt> {
//!         self.responses.lock().unwrap().pop_front().unwrap()
//!     }
//!
//!     async fn delete_asset(&self, _target: &ThemeTarget, _key: &AssetKey) -> StoreResult<()> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod notify;
pub mod store;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use notify::{ConsoleNotifier, Notification, Notifier};
pub use store::{
    AssetContent, AssetKey, AssetReceipt, RemoteAsset, StoreError, StoreResult, ThemeId,
    ThemeStore, ThemeTarget,
};
