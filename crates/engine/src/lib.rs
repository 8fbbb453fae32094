//! Bounded-concurrency resumable transfer engine.
//!
//! This crate implements the **business logic** for bulk file ingestion.
//! It is a library crate with no UI or storage dependencies — callers hand
//! the engine [`ByteSource`](bulkferry_transfer::ByteSource)s and receive
//! completed items through the [`EngineHooks`] collaborators.
//!
//! # Pipeline
//!
//! 1. **Enqueue** — filter sources by accepted type, derive slug and
//!    metadata, append to the batch in order
//! 2. **Schedule** — admit queued items FIFO, at most `concurrency` at a
//!    time (or in fixed whole batches)
//! 3. **Transfer** — read each source in chunks, publishing progress and
//!    honoring cancellation between chunks
//! 4. **Retry** — re-queue read failures after a backoff delay, up to
//!    `max_retries` per item
//! 5. **Report** — hand the completed subset to `on_items_created`

mod config;
mod controller;
mod engine;
mod events;
mod item;
mod registry;
mod scheduler;

#[cfg(test)]
mod testutil;

// Re-export primary types for convenience.
pub use config::{ScheduleMode, TransferConfig};
pub use engine::{
    EngineHooks, ItemsCreatedHook, MetadataHook, SlugHook, TransferEngine, TransferStats,
};
pub use events::EngineEvent;
pub use item::{ItemSnapshot, TransferItem, TransferState};
pub use registry::{ActionRegistry, EngineFactory};

/// Errors produced by engine operations.
///
/// Per-item transfer failures are never surfaced here — they are reported
/// through item state and [`TransferStats`]. These errors cover caller
/// mistakes only.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("cannot {event} item {id} in state {from}")]
    InvalidTransition {
        id: String,
        from: item::TransferState,
        event: &'static str,
    },

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("transfer error: {0}")]
    Transfer(#[from] bulkferry_transfer::TransferError),
}
