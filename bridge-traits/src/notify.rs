//! Desktop Notification Abstraction
//!
//! Forwards per-outcome sync notifications to a host notification surface:
//! - **macOS**: Notification Center
//! - **Windows**: toast notifications
//! - **Linux**: libnotify / DBus
//! - **Headless**: log lines via [`ConsoleNotifier`]
//!
//! Notifications are observational only: delivery failures are logged and
//! swallowed by callers, never surfaced into sync outcomes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline, e.g. the application name.
    pub title: String,
    /// Body text describing the outcome.
    pub message: String,
    /// Optional named sound cue understood by the host.
    pub sound: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            sound: None,
        }
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }
}

/// Notification sink trait.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::notify::{Notification, Notifier};
///
/// async fn announce(notifier: &dyn Notifier, file: &str) {
///     let note = Notification::new("Theme Sync", format!("Uploaded {}", file));
///     notifier.notify(note).await.ok();
/// }
/// ```
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification to the host surface.
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Console notifier for headless and development use.
///
/// Renders the triplet through `tracing` instead of a desktop surface, so
/// outcomes stay visible wherever logs go.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notification: Notification) -> Result<()> {
        tracing::info!(
            target: "notify",
            title = %notification.title,
            sound = notification.sound.as_deref().unwrap_or(""),
            "{}",
            notification.message
        );
        Ok(())
    }
}
