//! Engine progress and lifecycle events.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::item::TransferState;

/// Events published while the engine runs.
///
/// Consumed via [`TransferEngine::take_events`](crate::TransferEngine::take_events).
/// Sends never block the engine; events are dropped if the receiver falls
/// behind the channel capacity.
#[derive(Debug, Clone, Serialize)]
pub enum EngineEvent {
    /// An item entered a processing slot.
    Admitted { id: String, attempt: u32 },
    /// Cumulative progress for one item's current attempt.
    Progress {
        id: String,
        bytes_transferred: u64,
        total_bytes: u64,
    },
    /// An item changed lifecycle state.
    StateChanged { id: String, state: TransferState },
    /// A failed item was re-queued and will be re-admitted after `delay`.
    Retrying {
        id: String,
        attempt: u32,
        delay: Duration,
    },
}

/// Best-effort event publication.
pub(crate) fn emit(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    let _ = tx.try_send(event);
}
