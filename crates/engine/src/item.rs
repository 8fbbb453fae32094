//! Per-item transfer record and state machine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bulkferry_transfer::ByteSource;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Lifecycle state of a transfer item.
///
/// `Completed` and `Cancelled` are terminal; `Failed` is terminal once
/// retries are exhausted (the retry path re-enters `Queued` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Queued,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl TransferState {
    /// Returns `true` for states no transition leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Cancelled
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferState::Queued => "queued",
            TransferState::Processing => "processing",
            TransferState::Paused => "paused",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
            TransferState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Error message recorded on user cancellation.
pub(crate) const CANCELLED_BY_USER: &str = "Cancelled by user";

/// One file's transfer unit (thread-safe).
///
/// Identity, source, slug, metadata and total size are fixed at creation;
/// the mutable lifecycle lives behind a lock. The controller running an
/// item's attempt is the only writer of its progress, and at most one
/// cancellation token is installed while the item is `Processing`.
pub struct TransferItem {
    id: String,
    slug: String,
    metadata: HashMap<String, String>,
    total_bytes: u64,
    source: Arc<dyn ByteSource>,
    inner: RwLock<ItemInner>,
}

struct ItemInner {
    state: TransferState,
    bytes_transferred: u64,
    attempt: u32,
    error: Option<String>,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl TransferItem {
    /// Creates a queued item over `source` with a fresh id.
    pub fn new(source: Arc<dyn ByteSource>, slug: String, metadata: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            slug,
            metadata,
            total_bytes: source.len(),
            source,
            inner: RwLock::new(ItemInner {
                state: TransferState::Queued,
                bytes_transferred: 0,
                attempt: 0,
                error: None,
                started_at: None,
                ended_at: None,
                cancel: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn state(&self) -> TransferState {
        self.inner.read().unwrap().state
    }

    pub fn attempt(&self) -> u32 {
        self.inner.read().unwrap().attempt
    }

    /// Admits the item for processing, installing its cancellation token.
    ///
    /// Returns `false` if the item is no longer `Queued` (cancelled or
    /// removed while waiting for a slot). The new attempt re-reads the
    /// source from the start, so transferred bytes reset here.
    pub(crate) fn admit(&self, cancel: CancellationToken) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Queued {
            return false;
        }
        s.state = TransferState::Processing;
        s.bytes_transferred = 0;
        s.cancel = Some(cancel);
        if s.started_at.is_none() {
            s.started_at = Some(Instant::now());
        }
        true
    }

    /// Records cumulative bytes read for the current attempt.
    ///
    /// Ignored unless the item is `Processing` (the attempt may have been
    /// paused or cancelled while the chunk was in flight).
    pub(crate) fn set_progress(&self, bytes: u64) {
        let mut s = self.inner.write().unwrap();
        if s.state == TransferState::Processing {
            s.bytes_transferred = bytes.min(self.total_bytes);
        }
    }

    /// Marks the item completed. Returns `false` if a pause/cancel won the
    /// race and the item is no longer `Processing`.
    pub(crate) fn complete(&self) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Processing {
            return false;
        }
        s.state = TransferState::Completed;
        s.bytes_transferred = self.total_bytes;
        s.ended_at = Some(Instant::now());
        s.cancel = None;
        true
    }

    /// Marks the item permanently failed. Returns `false` if the item is
    /// no longer `Processing`.
    pub(crate) fn fail(&self, error: &str) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Processing {
            return false;
        }
        s.state = TransferState::Failed;
        s.error = Some(error.to_string());
        s.ended_at = Some(Instant::now());
        s.cancel = None;
        true
    }

    /// Re-queues the item after a retriable failure, consuming one retry.
    ///
    /// Returns the new attempt count, or `None` if the item is no longer
    /// `Processing`.
    pub(crate) fn retry(&self) -> Option<u32> {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Processing {
            return None;
        }
        s.state = TransferState::Queued;
        s.attempt += 1;
        s.bytes_transferred = 0;
        s.error = None;
        s.cancel = None;
        Some(s.attempt)
    }

    /// Parks a `Processing` item in `Paused`, handing back its token so
    /// the caller can abort the in-flight read. Bytes read so far are
    /// preserved.
    pub(crate) fn pause(&self) -> Result<Option<CancellationToken>, TransferState> {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Processing {
            return Err(s.state);
        }
        s.state = TransferState::Paused;
        Ok(s.cancel.take())
    }

    /// Returns a `Paused` item to `Queued`. Progress is left untouched;
    /// the next admission re-reads the source from the start.
    pub(crate) fn resume(&self) -> Result<(), TransferState> {
        let mut s = self.inner.write().unwrap();
        if s.state != TransferState::Paused {
            return Err(s.state);
        }
        s.state = TransferState::Queued;
        Ok(())
    }

    /// Cancels any non-terminal item, handing back the in-flight token if
    /// one was installed.
    pub(crate) fn cancel(&self) -> Result<Option<CancellationToken>, TransferState> {
        let mut s = self.inner.write().unwrap();
        if s.state.is_terminal() {
            return Err(s.state);
        }
        s.state = TransferState::Cancelled;
        s.error = Some(CANCELLED_BY_USER.to_string());
        s.ended_at = Some(Instant::now());
        Ok(s.cancel.take())
    }

    /// Returns a point-in-time copy of the item for display and callbacks.
    pub fn snapshot(&self) -> ItemSnapshot {
        let s = self.inner.read().unwrap();
        let elapsed = s.started_at.map(|started| match s.ended_at {
            Some(ended) => ended.duration_since(started),
            None => started.elapsed(),
        });
        ItemSnapshot {
            id: self.id.clone(),
            name: self.source.name().to_string(),
            slug: self.slug.clone(),
            state: s.state,
            bytes_transferred: s.bytes_transferred,
            total_bytes: self.total_bytes,
            attempt: s.attempt,
            error: s.error.clone(),
            elapsed,
            metadata: self.metadata.clone(),
        }
    }
}

/// A point-in-time view of a [`TransferItem`].
#[derive(Debug, Clone, Serialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub state: TransferState,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub attempt: u32,
    pub error: Option<String>,
    pub elapsed: Option<Duration>,
    pub metadata: HashMap<String, String>,
}

impl ItemSnapshot {
    /// Progress ratio in `[0, 1]`. A zero-byte item counts as done once
    /// it leaves `Queued`.
    pub fn progress(&self) -> f64 {
        if self.total_bytes == 0 {
            return if self.state == TransferState::Completed {
                1.0
            } else {
                0.0
            };
        }
        self.bytes_transferred as f64 / self.total_bytes as f64
    }
}
