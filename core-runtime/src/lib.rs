//! Runtime plumbing shared by the sync engine and store providers.
//!
//! Three concerns live here:
//!
//! - [`config`] - the validated settings surface a sync run starts from
//! - [`logging`] - tracing setup with credential redaction built in
//! - [`events`] - the broadcast bus that fans sync progress out to
//!   subscribers
//!
//! Nothing in this crate performs a theme operation. It is the layer the
//! sync queue and the store connector both stand on, which is also why its
//! error type covers only configuration and wiring.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
