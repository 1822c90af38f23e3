//! # Sync Queue
//!
//! Rate-limited dispatch of theme change events against the remote API.
//!
//! ## Overview
//!
//! The [`SyncQueue`] is the heart of the engine. Change events are admitted
//! in arrival order, each claiming the next sequence position from the
//! [`LeakyBucket`]; the position fixes the event's dispatch delay once, at
//! admission. Every admitted change then runs as its own task: wait out the
//! delay, make the remote call, settle, forward the settled change
//! downstream.
//!
//! ```text
//!  ChangeEvent ──► admission ──► bucket slot ──► per-change task
//!                     │                            │ sleep(delay)
//!                     │ streamed / unmappable      │ remote call
//!                     ▼                            │ retry (transient only)
//!                  rejected                        ▼
//!              (never forwarded)            SettledChange ──► downstream
//! ```
//!
//! ## Ordering
//!
//! Admission is first-in first-out: sequence positions follow arrival order.
//! Completion is not: a slow upload admitted early may settle after a quick
//! removal admitted late. Downstream consumers key off the settled change
//! itself, not its arrival rank.
//!
//! ## Failure Isolation
//!
//! A failed call settles that one change as failed and touches nothing else.
//! Only transient failures re-dispatch, under the queue's [`RetryPolicy`];
//! validation failures are deterministic and settle immediately. Either way
//! the settled change is forwarded downstream, marked with its outcome.
//!
//! ## Shutdown
//!
//! Cancelling the queue's token stops changes that have not yet fired from
//! ever contacting the API; those are counted as cancelled and not
//! forwarded. In-flight calls run to completion and settle normally.
//! [`shutdown()`](SyncQueue::shutdown) cancels and then waits for the
//! stragglers.
//!
//! ## Usage
//!
//! The settled-change receiver must be consumed concurrently: each task
//! forwards its own result and blocks when the channel is full.
//!
//! ```no_run
//! use std::sync::Arc;
//! use core_sync::{ChangeEvent, SyncQueue};
//! # async fn example(
//! #     config: core_runtime::config::CoreConfig,
//! #     store: Arc<dyn bridge_traits::ThemeStore>,
//! # ) -> core_sync::Result<()> {
//! let (queue, mut settled) = SyncQueue::new(config, store)?;
//!
//! tokio::spawn(async move {
//!     while let Some(change) = settled.recv().await {
//!         println!("{} -> {:?}", change.key, change.outcome);
//!     }
//! });
//!
//! queue
//!     .enqueue(ChangeEvent::upsert("sections/header.liquid", "<header/>"))
//!     .await?;
//! queue.drain().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{AssetContent, AssetKey, RemoteAsset, ThemeStore, ThemeTarget};
use core_runtime::config::CoreConfig;
use core_runtime::events::{BatchEvent, CoreEvent, EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::change::ChangeEvent;
use crate::error::{Result, SyncError};
use crate::executor::{OperationExecutor, SyncOutcome};
use crate::keys::AssetKeyMapper;
use crate::throttle::{DispatchSlot, LeakyBucket};

/// Buffered settled changes before forwarding tasks start blocking.
pub const SETTLED_CHANNEL_CAPACITY: usize = 64;

/// Backoff before the first re-dispatch of a transient failure.
const INITIAL_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Ceiling any computed retry backoff is clamped to.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

// ============================================================================
// Retry Policy
// ============================================================================

/// Bounds re-dispatch of transient failures.
///
/// Only [`UnknownError`](SyncOutcome::UnknownError) outcomes qualify:
/// validation rejections are deterministic and retrying them would burn
/// API quota for nothing. Every retry is admitted through the rate limiter
/// again, so a retrying change waits out whichever is longer, its backoff
/// or its fresh dispatch slot.
///
/// The default policy makes a single attempt per change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed per change, the initial attempt included.
    pub max_attempts: u32,
    /// Backoff before the first re-dispatch; doubles per further attempt.
    pub base_delay: Duration,
    /// Ceiling the computed backoff is clamped to.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy allowing up to `max_attempts` calls per change (clamped to at
    /// least one), with the default backoff schedule.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: INITIAL_RETRY_BACKOFF,
            max_delay: MAX_RETRY_BACKOFF,
        }
    }

    /// One call per change, no re-dispatch. The default.
    pub fn disabled() -> Self {
        Self::new(1)
    }

    /// Sets the backoff before the first re-dispatch.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the ceiling the computed backoff is clamped to.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Whether another call may follow `attempts_made` settled ones.
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Backoff before the given attempt number (`2` = first re-dispatch).
    ///
    /// Doubles per attempt from `base_delay`, clamped to `max_delay`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2);
        let factor = 2u32.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

// ============================================================================
// Batch Stats
// ============================================================================

/// Totals for one sync run.
///
/// Every change presented to the queue lands in exactly one bucket:
/// uploaded, removed, rejected, failed, or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Assets uploaded successfully.
    pub uploaded: u64,
    /// Assets removed successfully.
    pub removed: u64,
    /// Changes refused at admission (streamed payloads, unmappable paths).
    pub rejected: u64,
    /// Changes whose call settled with a classified failure.
    pub failed: u64,
    /// Dispatches stopped by shutdown before their call fired.
    pub cancelled: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl BatchStats {
    /// Total number of changes accounted for.
    pub fn total(&self) -> u64 {
        self.uploaded + self.removed + self.rejected + self.failed + self.cancelled
    }

    /// Whether every change settled successfully.
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.failed == 0 && self.cancelled == 0
    }
}

/// Live counters behind [`BatchStats`] snapshots.
#[derive(Debug, Default)]
struct Counters {
    uploaded: AtomicU64,
    removed: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl Counters {
    fn snapshot(&self, elapsed: Duration) -> BatchStats {
        BatchStats {
            uploaded: self.uploaded.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

// ============================================================================
// Settled Changes
// ============================================================================

/// A change event whose remote call has settled, forwarded downstream.
///
/// Carries the original event, the derived asset key, the sequence position
/// it was dispatched under, and the classified outcome. Failures are
/// forwarded too; rejected and cancelled changes never appear here.
#[derive(Debug)]
pub struct SettledChange {
    /// The change event as it was enqueued.
    pub change: ChangeEvent,
    /// The asset key the call addressed.
    pub key: AssetKey,
    /// Sequence position assigned at admission.
    pub position: u64,
    /// How the call settled.
    pub outcome: SyncOutcome,
}

impl SettledChange {
    /// Whether the call settled successfully.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// The remote call an admitted change resolves to.
enum Operation {
    Upsert(RemoteAsset),
    Delete,
}

impl Operation {
    async fn dispatch(&self, executor: &OperationExecutor, key: &AssetKey) -> SyncOutcome {
        match self {
            Operation::Upsert(asset) => executor.upsert(asset).await,
            Operation::Delete => executor.destroy(key).await,
        }
    }
}

// ============================================================================
// Sync Queue
// ============================================================================

/// Rate-limited dispatch queue for theme change events.
///
/// See the [module documentation](self) for the full lifecycle.
pub struct SyncQueue {
    mapper: AssetKeyMapper,
    limiter: Arc<LeakyBucket>,
    executor: Arc<OperationExecutor>,
    retry: RetryPolicy,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
    forward: mpsc::Sender<SettledChange>,
    tasks: Mutex<JoinSet<()>>,
    counters: Arc<Counters>,
    host: String,
    theme: ThemeTarget,
    created_at: Instant,
}

impl SyncQueue {
    /// Builds a queue from a validated config and a store, with retries
    /// disabled.
    ///
    /// Returns the queue paired with the receiver its settled changes flow
    /// out of. The receiver must be consumed concurrently with dispatch.
    pub fn new(
        config: CoreConfig,
        store: Arc<dyn ThemeStore>,
    ) -> Result<(Self, mpsc::Receiver<SettledChange>)> {
        Self::with_retry_policy(config, store, RetryPolicy::default())
    }

    /// Builds a queue that re-dispatches transient failures under `retry`.
    pub fn with_retry_policy(
        config: CoreConfig,
        store: Arc<dyn ThemeStore>,
        retry: RetryPolicy,
    ) -> Result<(Self, mpsc::Receiver<SettledChange>)> {
        config.validate().map_err(|e| SyncError::Config(e.to_string()))?;

        let mapper = AssetKeyMapper::new(config.base_path.as_deref())?;
        let limiter = Arc::new(LeakyBucket::new(config.burst_capacity, config.base_delay));
        let event_bus = Arc::new(EventBus::default());

        let mut executor =
            OperationExecutor::new(store, config.theme.clone(), Arc::clone(&event_bus));
        if let Some(notifier) = config.notifier.clone() {
            executor = executor.with_notifier(notifier);
        }

        let (forward, settled) = mpsc::channel(SETTLED_CHANNEL_CAPACITY);

        info!(
            host = %config.host,
            theme = %config.theme,
            base_path = %mapper.base().display(),
            burst_capacity = config.burst_capacity,
            base_delay_ms = config.base_delay.as_millis() as u64,
            "Ready to sync theme assets"
        );

        let queue = Self {
            mapper,
            limiter,
            executor: Arc::new(executor),
            retry,
            event_bus,
            cancel: CancellationToken::new(),
            forward,
            tasks: Mutex::new(JoinSet::new()),
            counters: Arc::new(Counters::default()),
            host: config.host,
            theme: config.theme,
            created_at: Instant::now(),
        };

        Ok((queue, settled))
    }

    /// Admits one change event and schedules its dispatch.
    ///
    /// Claims the next sequence position, emits a `Queued` event, and spawns
    /// the per-change task. Returns the dispatch slot the change was
    /// admitted under.
    ///
    /// Rejections happen here, before any remote contact: streamed payloads
    /// and paths no asset key can be derived for are counted, announced on
    /// the event bus, and returned as errors. Rejected changes are never
    /// forwarded downstream. After shutdown every change is refused as
    /// cancelled.
    #[instrument(skip(self, change), fields(path = %change.path_display()))]
    pub async fn enqueue(&self, change: ChangeEvent) -> Result<DispatchSlot> {
        if self.cancel.is_cancelled() {
            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!("Change refused after shutdown");
            return Err(SyncError::Cancelled);
        }

        if change.is_streamed() {
            let path = change.path_display();
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Streamed payload rejected");
            self.emit(CoreEvent::Sync(SyncEvent::Rejected {
                path: path.clone(),
                reason: "streamed payloads are not supported".to_string(),
            }));
            return Err(SyncError::StreamedPayload { path });
        }

        let key = match self.mapper.asset_key(change.path()) {
            Ok(key) => key,
            Err(err) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "Change rejected at admission");
                self.emit(CoreEvent::Sync(SyncEvent::Rejected {
                    path: change.path_display(),
                    reason: err.to_string(),
                }));
                return Err(err);
            }
        };

        // Content is classified once, at admission; the dispatch task only
        // performs the remote call.
        let operation = match change.content() {
            Some(bytes) => Operation::Upsert(RemoteAsset::new(
                key.clone(),
                AssetContent::from_bytes(bytes.clone()),
            )),
            None => Operation::Delete,
        };

        let slot = self.limiter.admit();
        debug!(
            key = %key,
            position = slot.sequence_position,
            delay_ms = slot.scheduled_delay.as_millis() as u64,
            "Change admitted"
        );
        self.emit(CoreEvent::Sync(SyncEvent::Queued {
            key: key.to_string(),
            position: slot.sequence_position,
            delay_ms: slot.scheduled_delay.as_millis() as u64,
        }));

        let task = DispatchTask {
            change,
            key,
            operation,
            slot,
            limiter: Arc::clone(&self.limiter),
            executor: Arc::clone(&self.executor),
            retry: self.retry.clone(),
            event_bus: Arc::clone(&self.event_bus),
            cancel: self.cancel.clone(),
            forward: self.forward.clone(),
            counters: Arc::clone(&self.counters),
        };
        self.tasks.lock().await.spawn(task.run());

        Ok(slot)
    }

    /// Waits for every spawned dispatch task to settle.
    ///
    /// Blocks admission while it runs. If the settled-change channel is
    /// full this waits for the downstream consumer to catch up.
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "Dispatch task failed to join");
            }
        }
    }

    /// Cancels pending dispatches and waits for in-flight calls to settle.
    pub async fn shutdown(&self) {
        info!("Shutting down sync queue");
        self.cancel.cancel();
        self.drain().await;
    }

    /// Drives one batch: drains a channel of change events, waits for every
    /// dispatch to settle, and returns the totals.
    ///
    /// Emits `Batch` lifecycle events around the run. On cancellation the
    /// remaining buffered changes are counted as cancelled without ever
    /// contacting the API.
    #[instrument(skip(self, changes))]
    pub async fn process(&self, mut changes: mpsc::Receiver<ChangeEvent>) -> BatchStats {
        let batch_id = Uuid::new_v4().to_string();
        let started = Instant::now();

        info!(batch_id = %batch_id, host = %self.host, theme = %self.theme, "Batch started");
        self.emit(CoreEvent::Batch(BatchEvent::Started {
            batch_id: batch_id.clone(),
            host: self.host.clone(),
            theme: self.theme.to_string(),
        }));

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    // Whatever is still buffered never gets admitted.
                    changes.close();
                    while let Some(change) = changes.recv().await {
                        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                        debug!(path = %change.path_display(), "Change dropped by shutdown");
                    }
                    break;
                }
                next = changes.recv() => match next {
                    Some(change) => {
                        // Rejections are counted and announced at admission.
                        let _ = self.enqueue(change).await;
                    }
                    None => break,
                }
            }
        }

        self.drain().await;

        let stats = self.counters.snapshot(started.elapsed());
        info!(
            batch_id = %batch_id,
            uploaded = stats.uploaded,
            removed = stats.removed,
            rejected = stats.rejected,
            failed = stats.failed,
            cancelled = stats.cancelled,
            duration_ms = stats.elapsed.as_millis() as u64,
            "Batch completed"
        );
        self.emit(CoreEvent::Batch(BatchEvent::Completed {
            batch_id,
            uploaded: stats.uploaded,
            removed: stats.removed,
            rejected: stats.rejected,
            failed: stats.failed,
            cancelled: stats.cancelled,
            duration_ms: stats.elapsed.as_millis() as u64,
        }));

        stats
    }

    /// The bus sync and batch events are published on.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Snapshot of the counters since the queue was built.
    pub fn stats(&self) -> BatchStats {
        self.counters.snapshot(self.created_at.elapsed())
    }

    /// Token external shutdown hooks can cancel.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn emit(&self, event: CoreEvent) {
        // Observation is best-effort; a bus without subscribers is fine.
        self.event_bus.emit(event).ok();
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("host", &self.host)
            .field("theme", &self.theme)
            .field("admitted", &self.limiter.admitted())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Dispatch Task
// ============================================================================

/// Everything one admitted change needs to run to settlement on its own.
struct DispatchTask {
    change: ChangeEvent,
    key: AssetKey,
    operation: Operation,
    slot: DispatchSlot,
    limiter: Arc<LeakyBucket>,
    executor: Arc<OperationExecutor>,
    retry: RetryPolicy,
    event_bus: Arc<EventBus>,
    cancel: CancellationToken,
    forward: mpsc::Sender<SettledChange>,
    counters: Arc<Counters>,
}

impl DispatchTask {
    async fn run(self) {
        let Self {
            change,
            key,
            operation,
            slot,
            limiter,
            executor,
            retry,
            event_bus,
            cancel,
            forward,
            counters,
        } = self;

        // Hold the call until its slot, unless shutdown wins the race.
        let fired = if slot.scheduled_delay.is_zero() {
            !cancel.is_cancelled()
        } else {
            tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(slot.scheduled_delay) => true,
            }
        };
        if !fired {
            counters.cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Dispatch cancelled before the call fired");
            event_bus
                .emit(CoreEvent::Sync(SyncEvent::Cancelled {
                    key: key.to_string(),
                }))
                .ok();
            return;
        }

        let mut outcome = operation.dispatch(&executor, &key).await;

        // Transient failures may re-dispatch; each attempt claims a fresh
        // slot and waits out the longer of backoff and slot delay.
        let mut attempt: u32 = 1;
        while matches!(outcome, SyncOutcome::UnknownError { .. }) && retry.allows_retry(attempt) {
            attempt += 1;
            let backoff = retry.backoff_delay(attempt);
            let relimit = limiter.admit().scheduled_delay;
            let wait = backoff.max(relimit);

            info!(
                key = %key,
                attempt,
                delay_ms = wait.as_millis() as u64,
                "Retrying after transient failure"
            );
            event_bus
                .emit(CoreEvent::Sync(SyncEvent::Retrying {
                    key: key.to_string(),
                    attempt,
                    delay_ms: wait.as_millis() as u64,
                }))
                .ok();

            let resumed = tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(wait) => true,
            };
            if !resumed {
                // Shutdown mid-backoff. The call already failed once;
                // settle with that failure rather than pretending the
                // change never ran.
                break;
            }

            outcome = operation.dispatch(&executor, &key).await;
        }

        match (&outcome, &operation) {
            (SyncOutcome::Success, Operation::Upsert(_)) => {
                counters.uploaded.fetch_add(1, Ordering::Relaxed);
            }
            (SyncOutcome::Success, Operation::Delete) => {
                counters.removed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        // Forward exactly once, after this change's own call settled. Other
        // changes keep dispatching regardless of channel pressure here.
        let settled = SettledChange {
            change,
            key,
            position: slot.sequence_position,
            outcome,
        };
        if forward.send(settled).await.is_err() {
            warn!("Downstream receiver dropped; settled change not forwarded");
        }
    }
}
