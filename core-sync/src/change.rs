//! # Change Events
//!
//! Input model for the sync pipeline: one event per observed file-system
//! change, produced by an external watcher and consumed exactly once by the
//! sync queue.
//!
//! ## Overview
//!
//! A [`ChangeEvent`] carries the local path and a [`FilePayload`]:
//! - `Buffered` bytes mean the file exists and should be upserted remotely
//! - `Absent` means the file was deleted and the remote asset should go too
//! - `Streamed` marks contents that were never buffered; the queue refuses
//!   these before any remote contact
//!
//! The operation kind is derived from the payload, never stored separately,
//! so an event can't claim a deletion while carrying content.

use bytes::Bytes;
use std::path::{Path, PathBuf};

/// The contents attached to a change event.
#[derive(Debug, Clone)]
pub enum FilePayload {
    /// Contents fully read into memory.
    Buffered(Bytes),
    /// Contents only available as a stream; unsupported input.
    Streamed,
    /// No contents: the file was deleted.
    Absent,
}

/// Which remote operation a change maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Create or overwrite the remote asset.
    Upsert,
    /// Remove the remote asset.
    Delete,
}

impl ChangeKind {
    /// Stable lowercase name for logs and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file-system change observed by the watcher.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Local path of the changed file.
    pub path: PathBuf,
    /// Contents, if any.
    pub payload: FilePayload,
}

impl ChangeEvent {
    /// A create-or-update change carrying the file's buffered contents.
    pub fn upsert(path: impl Into<PathBuf>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            payload: FilePayload::Buffered(content.into()),
        }
    }

    /// A deletion change.
    pub fn delete(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: FilePayload::Absent,
        }
    }

    /// A change whose contents were only available as a stream.
    ///
    /// The sync queue rejects these at admission.
    pub fn streamed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            payload: FilePayload::Streamed,
        }
    }

    /// The local path of the change.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The operation this change maps to, or `None` for streamed payloads.
    pub fn kind(&self) -> Option<ChangeKind> {
        match self.payload {
            FilePayload::Buffered(_) => Some(ChangeKind::Upsert),
            FilePayload::Absent => Some(ChangeKind::Delete),
            FilePayload::Streamed => None,
        }
    }

    /// Whether the payload was declared streamed (unsupported).
    pub fn is_streamed(&self) -> bool {
        matches!(self.payload, FilePayload::Streamed)
    }

    /// The buffered contents, if this is an upsert.
    pub fn content(&self) -> Option<&Bytes> {
        match &self.payload {
            FilePayload::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Lossy display form of the path for logs and events.
    pub fn path_display(&self) -> String {
        self.path.display().to_string()
    }
}
