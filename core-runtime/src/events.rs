//! # Sync Event Bus
//!
//! Broadcast channel carrying the pipeline's observable moments: per-file
//! sync events and per-run batch events, published as they happen and
//! consumed by whoever cares to watch.
//!
//! ## Overview
//!
//! The queue and executor publish [`CoreEvent`]s onto an [`EventBus`];
//! any number of subscribers watch independently. Publishing never blocks
//! and never fails the sync path: a bus nobody listens to swallows events,
//! and a subscriber that falls behind loses the oldest ones rather than
//! slowing the publisher down.
//!
//! Every event is serde-serializable, so a subscriber can ship them across
//! a process boundary as JSON without re-modelling anything.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::default();
//! let mut watcher = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Uploaded {
//!     key: "assets/site.css".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(
//!     watcher.recv().await,
//!     Ok(CoreEvent::Sync(SyncEvent::Uploaded { .. }))
//! ));
//! # }
//! ```
//!
//! Subscribers see [`RecvError::Lagged`] when they missed events (resume
//! and carry on) and [`RecvError::Closed`] when every publisher is gone
//! (time to exit). [`EventStream`] wraps a subscription with a predicate
//! for consumers that only want a slice of the traffic.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events buffered per subscriber before the oldest are dropped.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Severity and Failure Classification
// ============================================================================

/// Coarse severity attached to every event, for subscribers that filter
/// rather than pattern-match.
///
/// Ordered so thresholds compose naturally: `severity() >= Warning` keeps
/// retries, cancellations, and failures while dropping routine progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Chatter: dispatch about to happen.
    Debug,
    /// Routine progress: settlements, batch lifecycle.
    Info,
    /// Recoverable wrinkles: retries, cancellations.
    Warning,
    /// Settled failures and refused input.
    Error,
}

/// How a settled failure was classified.
///
/// Mirrors the store-level split: validation failures are deterministic and
/// never retried, everything else may be retried under an explicit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Remote rejected the asset as structurally invalid.
    Validation,
    /// Transport failure, server error, or otherwise unexplained.
    Unknown,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Per-file events, one stream per change as it moves through the pipeline.
///
/// The happy path is `Queued` then `Uploading` then `Uploaded` (or
/// `Removed`); the detours are `Rejected` at admission, `Retrying` between
/// attempts, `Cancelled` at shutdown, and the two `*Failed` settlements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Change admitted to the queue and given a dispatch slot.
    Queued {
        /// The asset key derived from the changed file.
        key: String,
        /// Sequence position assigned at admission (0-based).
        position: u64,
        /// Scheduled delay before dispatch, in milliseconds.
        delay_ms: u64,
    },
    /// Remote upload call about to fire.
    Uploading { key: String },
    /// Upload settled successfully.
    Uploaded { key: String },
    /// Removal settled successfully.
    Removed { key: String },
    /// Upload settled with a classified failure.
    UploadFailed {
        key: String,
        class: FailureClass,
        message: String,
    },
    /// Removal settled with a classified failure.
    RemoveFailed {
        key: String,
        class: FailureClass,
        message: String,
    },
    /// Unsupported input refused at admission, before any remote contact.
    Rejected {
        /// Local path of the refused change; no asset key exists for it.
        path: String,
        reason: String,
    },
    /// Transient failure about to be re-dispatched under the retry policy.
    Retrying {
        key: String,
        /// Attempt number about to run (2 = first retry).
        attempt: u32,
        /// Wait before the attempt, in milliseconds.
        delay_ms: u64,
    },
    /// Dispatch stopped by shutdown before its call fired.
    Cancelled { key: String },
}

impl SyncEvent {
    fn severity(&self) -> EventSeverity {
        match self {
            Self::Queued { .. } | Self::Uploading { .. } => EventSeverity::Debug,
            Self::Uploaded { .. } | Self::Removed { .. } => EventSeverity::Info,
            Self::Retrying { .. } | Self::Cancelled { .. } => EventSeverity::Warning,
            Self::UploadFailed { .. } | Self::RemoveFailed { .. } | Self::Rejected { .. } => {
                EventSeverity::Error
            }
        }
    }

    fn description(&self) -> &str {
        match self {
            Self::Queued { .. } => "Change queued for sync",
            Self::Uploading { .. } => "Uploading asset",
            Self::Uploaded { .. } => "Upload complete",
            Self::Removed { .. } => "Removal complete",
            Self::UploadFailed { .. } => "Upload failed",
            Self::RemoveFailed { .. } => "Removal failed",
            Self::Rejected { .. } => "Unsupported change rejected",
            Self::Retrying { .. } => "Retrying after transient failure",
            Self::Cancelled { .. } => "Dispatch cancelled",
        }
    }
}

// ============================================================================
// Batch Events
// ============================================================================

/// Per-run events bracketing one batch of changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BatchEvent {
    /// A batch of changes began processing.
    Started {
        /// Correlation id shared by this batch's two events.
        batch_id: String,
        /// The store host being synced to.
        host: String,
        /// The theme target ("published" or a theme id).
        theme: String,
    },
    /// The batch drained, with final counts.
    Completed {
        batch_id: String,
        uploaded: u64,
        removed: u64,
        rejected: u64,
        failed: u64,
        cancelled: u64,
        /// Wall-clock duration of the batch in milliseconds.
        duration_ms: u64,
    },
}

impl BatchEvent {
    fn description(&self) -> &str {
        match self {
            Self::Started { .. } => "Batch started",
            Self::Completed { .. } => "Batch completed",
        }
    }
}

// ============================================================================
// Core Event
// ============================================================================

/// Everything the pipeline publishes, tagged by category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Per-file sync events.
    Sync(SyncEvent),
    /// Per-run batch events.
    Batch(BatchEvent),
}

impl CoreEvent {
    /// Short human-readable label, stable across releases.
    pub fn description(&self) -> &str {
        match self {
            Self::Sync(event) => event.description(),
            Self::Batch(event) => event.description(),
        }
    }

    /// Severity for threshold-style filtering.
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::Sync(event) => event.severity(),
            Self::Batch(_) => EventSeverity::Info,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Fan-out publisher for [`CoreEvent`]s.
///
/// A thin wrapper over `tokio::sync::broadcast`: cloning the bus clones the
/// sending side, each [`subscribe()`](Self::subscribe) opens an independent
/// receiving side, and slow receivers lag instead of applying backpressure.
/// The sync path emits with `.ok()`; observation must never fail an upload.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes one event to every current subscriber.
    ///
    /// Returns how many subscribers will see it, or an error when there are
    /// none. Past events are never replayed to late subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Opens a fresh subscription receiving all events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of currently open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Filtered Event Stream
// ============================================================================

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A subscription that only yields events passing a predicate.
///
/// Non-matching events are consumed and dropped, so a narrow filter still
/// keeps the underlying subscription from lagging on traffic it ignores.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::default();
/// let mut failures = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    /// Wraps a plain subscription; without a filter it passes everything.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Restricts the stream to events the predicate accepts.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(event),
            None => true,
        }
    }

    /// Waits for the next event passing the filter.
    ///
    /// Lag on the underlying subscription surfaces as
    /// [`RecvError::Lagged`] even when the missed events would have been
    /// filtered out; the caller cannot know either way.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Drains buffered events until one passes the filter, without waiting.
    ///
    /// `None` means nothing matching is buffered right now.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(n)) => return Some(Err(RecvError::Lagged(n))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded(key: &str) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Uploaded {
            key: key.to_string(),
        })
    }

    fn queued(key: &str, position: u64, delay_ms: u64) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Queued {
            key: key.to_string(),
            position,
            delay_ms,
        })
    }

    #[test]
    fn test_severity_threshold_keeps_failures_above_progress() {
        let failed = CoreEvent::Sync(SyncEvent::UploadFailed {
            key: "layout/theme.liquid".to_string(),
            class: FailureClass::Unknown,
            message: "HTTP 500".to_string(),
        });
        let rejected = CoreEvent::Sync(SyncEvent::Rejected {
            path: "assets/video.mp4".to_string(),
            reason: "streamed payloads are not supported".to_string(),
        });
        let retrying = CoreEvent::Sync(SyncEvent::Retrying {
            key: "assets/app.js".to_string(),
            attempt: 2,
            delay_ms: 500,
        });

        assert!(failed.severity() >= EventSeverity::Error);
        assert!(rejected.severity() >= EventSeverity::Error);
        assert_eq!(retrying.severity(), EventSeverity::Warning);
        assert!(uploaded("assets/site.css").severity() < EventSeverity::Warning);
        assert_eq!(queued("assets/site.css", 0, 0).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_batch_events_are_informational() {
        let started = CoreEvent::Batch(BatchEvent::Started {
            batch_id: "b-1".to_string(),
            host: "store-name.myshopify.com".to_string(),
            theme: "148460".to_string(),
        });
        assert_eq!(started.severity(), EventSeverity::Info);
        assert_eq!(started.description(), "Batch started");
    }

    #[test]
    fn test_failure_class_display() {
        assert_eq!(FailureClass::Validation.to_string(), "validation");
        assert_eq!(FailureClass::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_descriptions_are_stable() {
        assert_eq!(uploaded("x").description(), "Upload complete");
        assert_eq!(
            CoreEvent::Sync(SyncEvent::Cancelled {
                key: "x".to_string()
            })
            .description(),
            "Dispatch cancelled"
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_an_error() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(uploaded("assets/site.css")).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_each_event() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = queued("templates/product.liquid", 41, 500);
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_past_events() {
        let bus = EventBus::new(8);
        let _early = bus.subscribe();

        bus.emit(uploaded("assets/before.css")).ok();

        let mut late = bus.subscribe();
        bus.emit(uploaded("assets/after.css")).ok();

        // Only traffic emitted after the subscription shows up.
        assert_eq!(late.recv().await.unwrap(), uploaded("assets/after.css"));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();

        for position in 0..5u64 {
            bus.emit(queued(&format!("assets/f{}.css", position), position, 0))
                .ok();
        }

        // The two newest survive; the receiver learns it missed the rest.
        assert!(matches!(slow.recv().await, Err(RecvError::Lagged(3))));
        assert!(slow.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_emitters_share_one_bus() {
        let bus = EventBus::new(64);
        let mut sub = bus.subscribe();

        let uploads = {
            let bus = bus.clone();
            tokio::spawn(async move {
                for i in 0..12 {
                    bus.emit(uploaded(&format!("assets/u{}.css", i))).ok();
                }
            })
        };
        let admissions = {
            let bus = bus.clone();
            tokio::spawn(async move {
                for i in 0..12u64 {
                    bus.emit(queued(&format!("assets/q{}.css", i), i, 0)).ok();
                }
            })
        };
        uploads.await.unwrap();
        admissions.await.unwrap();

        let mut seen = 0;
        while sub.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 24);
    }

    #[tokio::test]
    async fn test_stream_without_filter_passes_everything() {
        let bus = EventBus::new(8);
        let mut stream = EventStream::new(bus.subscribe());

        let event = CoreEvent::Sync(SyncEvent::Removed {
            key: "snippets/old.liquid".to_string(),
        });
        bus.emit(event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_stream_filter_skips_non_matching_traffic() {
        let bus = EventBus::new(8);
        let mut failures = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() >= EventSeverity::Error);

        bus.emit(queued("assets/site.css", 0, 0)).ok();
        bus.emit(uploaded("assets/site.css")).ok();
        let failure = CoreEvent::Sync(SyncEvent::RemoveFailed {
            key: "snippets/gone.liquid".to_string(),
            class: FailureClass::Validation,
            message: "no such asset".to_string(),
        });
        bus.emit(failure.clone()).ok();

        // The two routine events are consumed and dropped.
        assert_eq!(failures.recv().await.unwrap(), failure);
    }

    #[tokio::test]
    async fn test_stream_try_recv_quiet_and_filtered() {
        let bus = EventBus::new(8);
        let mut batches =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Batch(_)));

        assert!(batches.try_recv().is_none());

        bus.emit(uploaded("assets/site.css")).ok();
        assert!(batches.try_recv().is_none());

        let completed = CoreEvent::Batch(BatchEvent::Completed {
            batch_id: "b-1".to_string(),
            uploaded: 42,
            removed: 0,
            rejected: 0,
            failed: 0,
            cancelled: 0,
            duration_ms: 1000,
        });
        bus.emit(completed.clone()).ok();
        assert_eq!(batches.try_recv().unwrap().unwrap(), completed);
    }

    #[test]
    fn test_events_serialize_with_stable_tags() {
        let event = CoreEvent::Sync(SyncEvent::UploadFailed {
            key: "layout/theme.liquid".to_string(),
            class: FailureClass::Unknown,
            message: "HTTP 500".to_string(),
        });

        let json: serde_json::Value = serde_json::from_str(
            &serde_json::to_string(&event).unwrap(),
        )
        .unwrap();

        assert_eq!(json["type"], "Sync");
        assert_eq!(json["payload"]["event"], "UploadFailed");
        assert_eq!(json["payload"]["class"], "unknown");
        assert_eq!(json["payload"]["key"], "layout/theme.liquid");
    }

    #[test]
    fn test_events_round_trip_through_json() {
        let original = CoreEvent::Batch(BatchEvent::Started {
            batch_id: "b-7".to_string(),
            host: "store-name.myshopify.com".to_string(),
            theme: "published".to_string(),
        });

        let json = serde_json::to_string(&original).unwrap();
        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
