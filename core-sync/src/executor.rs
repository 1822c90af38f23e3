//! # Operation Execution
//!
//! Performs single remote calls and classifies their outcomes.
//!
//! ## Overview
//!
//! The [`OperationExecutor`] sits between the sync queue and the
//! [`ThemeStore`]: given an upsert or a removal it makes exactly one remote
//! call and reduces whatever happened to a [`SyncOutcome`]:
//!
//! - `Success` - the call settled cleanly
//! - `ValidationError` - the remote rejected the asset as structurally
//!   invalid (bad key, disallowed directory); deterministic, never worth
//!   retrying
//! - `UnknownError` - transport failures, server errors, anything else; a
//!   caller-side policy may retry these
//!
//! Every outcome produces a log line, an event on the bus, and (when a
//! notifier is wired in) a desktop notification. A failed call never returns
//! an `Err`: failure is data here, handled per event by the queue.

use std::sync::Arc;

use bridge_traits::{AssetKey, Notification, Notifier, RemoteAsset, StoreError, ThemeStore, ThemeTarget};
use core_runtime::events::{CoreEvent, EventBus, FailureClass, SyncEvent};
use tracing::{debug, error, info, instrument, warn};

/// Sound name attached to failure notifications.
const FAILURE_SOUND: &str = "Basso";

/// The classified result of one settled remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The call returned without error.
    Success,
    /// The remote rejected the asset as structurally invalid.
    ValidationError {
        /// Structured detail from the remote, when it supplied any.
        message: String,
    },
    /// Any other failure: transport, server error, unexplained.
    UnknownError {
        /// Raw error detail for the log.
        message: String,
    },
}

impl SyncOutcome {
    /// Whether the call settled successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Whether the remote classified the request as invalid.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    /// Whether this outcome is any kind of failure.
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The event-bus classification for failures, `None` on success.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            Self::Success => None,
            Self::ValidationError { .. } => Some(FailureClass::Validation),
            Self::UnknownError { .. } => Some(FailureClass::Unknown),
        }
    }

    /// The failure message, `None` on success.
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::ValidationError { message } | Self::UnknownError { message } => Some(message),
        }
    }

    fn from_store_error(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRequest { detail } => Self::ValidationError { message: detail },
            other => Self::UnknownError {
                message: other.to_string(),
            },
        }
    }
}

/// Drives single remote calls against a [`ThemeStore`] and reports outcomes.
pub struct OperationExecutor {
    store: Arc<dyn ThemeStore>,
    target: ThemeTarget,
    event_bus: Arc<EventBus>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl OperationExecutor {
    /// Create an executor over a store, aimed at one theme target.
    pub fn new(store: Arc<dyn ThemeStore>, target: ThemeTarget, event_bus: Arc<EventBus>) -> Self {
        Self {
            store,
            target,
            event_bus,
            notifier: None,
        }
    }

    /// Attach a notifier; each settled outcome then also produces a
    /// title/message/sound triplet.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// The theme target this executor uploads to.
    pub fn target(&self) -> &ThemeTarget {
        &self.target
    }

    /// Upload one asset. Exactly one remote call; the outcome classifies it.
    #[instrument(skip(self, asset), fields(key = %asset.key))]
    pub async fn upsert(&self, asset: &RemoteAsset) -> SyncOutcome {
        debug!(
            kind = asset.content.kind_str(),
            size = asset.content.len(),
            "Uploading asset"
        );
        self.emit(SyncEvent::Uploading {
            key: asset.key.to_string(),
        });

        let outcome = match self.store.update_asset(&self.target, asset).await {
            Ok(receipt) => {
                info!(size = ?receipt.size, "Upload complete");
                SyncOutcome::Success
            }
            Err(err) => SyncOutcome::from_store_error(err),
        };

        match &outcome {
            SyncOutcome::Success => {
                self.emit(SyncEvent::Uploaded {
                    key: asset.key.to_string(),
                });
                self.notify(Notification::new(
                    "Upload Complete",
                    format!("Uploaded {}", asset.key),
                ))
                .await;
            }
            SyncOutcome::ValidationError { message } => {
                error!(detail = %message, "Invalid asset request");
                self.emit_failure(&asset.key, &outcome, true);
                self.notify(
                    Notification::new("Upload Failed", format!("Invalid request for {}", asset.key))
                        .with_sound(FAILURE_SOUND),
                )
                .await;
            }
            SyncOutcome::UnknownError { message } => {
                error!(error = %message, "Upload failed");
                self.emit_failure(&asset.key, &outcome, true);
                self.notify(
                    Notification::new("Upload Failed", format!("{}: {}", asset.key, message))
                        .with_sound(FAILURE_SOUND),
                )
                .await;
            }
        }

        outcome
    }

    /// Remove one asset. Same single-call contract and classification as
    /// [`upsert`](Self::upsert).
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn destroy(&self, key: &AssetKey) -> SyncOutcome {
        debug!("Removing asset");

        let outcome = match self.store.delete_asset(&self.target, key).await {
            Ok(()) => {
                info!("Asset removed");
                SyncOutcome::Success
            }
            Err(err) => SyncOutcome::from_store_error(err),
        };

        match &outcome {
            SyncOutcome::Success => {
                self.emit(SyncEvent::Removed {
                    key: key.to_string(),
                });
                self.notify(Notification::new("Asset Removed", format!("Removed {}", key)))
                    .await;
            }
            SyncOutcome::ValidationError { message } => {
                error!(detail = %message, "Invalid removal request");
                self.emit_failure(key, &outcome, false);
                self.notify(
                    Notification::new("Remove Failed", format!("Invalid request for {}", key))
                        .with_sound(FAILURE_SOUND),
                )
                .await;
            }
            SyncOutcome::UnknownError { message } => {
                error!(error = %message, "Removal failed");
                self.emit_failure(key, &outcome, false);
                self.notify(
                    Notification::new("Remove Failed", format!("{}: {}", key, message))
                        .with_sound(FAILURE_SOUND),
                )
                .await;
            }
        }

        outcome
    }

    fn emit(&self, event: SyncEvent) {
        // Observation is best-effort; a bus without subscribers is fine.
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }

    fn emit_failure(&self, key: &AssetKey, outcome: &SyncOutcome, upload: bool) {
        let (Some(class), Some(message)) = (outcome.failure_class(), outcome.failure_message())
        else {
            return;
        };

        let event = if upload {
            SyncEvent::UploadFailed {
                key: key.to_string(),
                class,
                message: message.to_string(),
            }
        } else {
            SyncEvent::RemoveFailed {
                key: key.to_string(),
                class,
                message: message.to_string(),
            }
        };

        self.emit(event);
    }

    async fn notify(&self, notification: Notification) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        if let Err(err) = notifier.notify(notification).await {
            warn!(error = %err, "Notifier failed");
        }
    }
}

impl std::fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("target", &self.target)
            .field("has_notifier", &self.notifier.is_some())
            .finish()
    }
}
