//! # Theme Sync Engine
//!
//! Rate-limited synchronization of local theme files against a remote store.
//!
//! ## Overview
//!
//! This crate turns change events (a file was written, a file was deleted)
//! into paced remote calls:
//! - Deriving URL-encoded asset keys from local paths
//! - Admitting changes through a leaky-bucket rate limiter
//! - Executing upserts and removals with three-way outcome classification
//! - Re-dispatching transient failures under a bounded retry policy
//! - Forwarding settled changes downstream, failures included
//!
//! ## Components
//!
//! - **Change Events** (`change`): buffered, streamed, and absent file payloads
//! - **Key Mapping** (`keys`): local path to remote asset key derivation
//! - **Throttle** (`throttle`): leaky-bucket dispatch slot assignment
//! - **Executor** (`executor`): one remote call, one classified outcome
//! - **Sync Queue** (`queue`): admission, dispatch, settlement, batch stats

pub mod change;
pub mod error;
pub mod executor;
pub mod keys;
pub mod queue;
pub mod throttle;

pub use change::{ChangeEvent, ChangeKind, FilePayload};
pub use error::{Result, SyncError};
pub use executor::{OperationExecutor, SyncOutcome};
pub use keys::AssetKeyMapper;
pub use queue::{BatchStats, RetryPolicy, SettledChange, SyncQueue, SETTLED_CHANNEL_CAPACITY};
pub use throttle::{DispatchSlot, LeakyBucket, LEAK_RATE_PER_SEC};
