//! Single-attempt transfer execution.
//!
//! The controller runs one processing attempt for one item: it installs
//! the cancellation token, streams the source in chunks off the async
//! runtime, publishes progress, and maps the result onto the item's state
//! machine. Retry pacing and re-admission belong to the scheduler.

use std::sync::Arc;
use std::time::Duration;

use bulkferry_transfer::{ChunkReader, TransferError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::events::{EngineEvent, emit};
use crate::item::{TransferItem, TransferState};

/// Result of one processing attempt.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
    Completed,
    /// The item was re-queued; re-admit once `delay` elapsed.
    Retry { delay: Duration },
    Failed,
    Cancelled,
    Paused,
}

/// Runs one processing attempt for `item`.
pub(crate) async fn run_attempt(
    item: Arc<TransferItem>,
    config: Arc<TransferConfig>,
    events: mpsc::Sender<EngineEvent>,
) -> AttemptOutcome {
    let cancel = CancellationToken::new();
    if !item.admit(cancel.clone()) {
        // Cancelled while waiting for a slot.
        return interrupted_outcome(&item);
    }

    let attempt = item.attempt();
    debug!(item = %item.id(), attempt, bytes = item.total_bytes(), "admitted");
    emit(
        &events,
        EngineEvent::Admitted {
            id: item.id().to_string(),
            attempt,
        },
    );
    emit(
        &events,
        EngineEvent::StateChanged {
            id: item.id().to_string(),
            state: TransferState::Processing,
        },
    );

    match transfer(&item, &config, cancel, &events).await {
        Ok(()) => {
            if !item.complete() {
                // A pause or cancel landed after the last chunk was read.
                return interrupted_outcome(&item);
            }
            emit(
                &events,
                EngineEvent::Progress {
                    id: item.id().to_string(),
                    bytes_transferred: item.total_bytes(),
                    total_bytes: item.total_bytes(),
                },
            );
            emit(
                &events,
                EngineEvent::StateChanged {
                    id: item.id().to_string(),
                    state: TransferState::Completed,
                },
            );
            info!(item = %item.id(), bytes = item.total_bytes(), "transfer completed");
            AttemptOutcome::Completed
        }
        Err(TransferError::Cancelled) => interrupted_outcome(&item),
        Err(err) => failure_outcome(&item, &config, &events, err),
    }
}

/// Streams the whole source, publishing per-chunk progress.
async fn transfer(
    item: &Arc<TransferItem>,
    config: &TransferConfig,
    cancel: CancellationToken,
    events: &mpsc::Sender<EngineEvent>,
) -> Result<(), TransferError> {
    let source = Arc::clone(item.source());
    let raw = tokio::task::spawn_blocking(move || source.open())
        .await
        .map_err(join_error)??;

    let mut reader = ChunkReader::new(raw, item.total_bytes(), config.chunk_size, cancel);

    loop {
        // Source reads are blocking; hop off the async threads per chunk.
        let (returned, chunk) = tokio::task::spawn_blocking(move || {
            let chunk = reader.next_chunk();
            (reader, chunk)
        })
        .await
        .map_err(join_error)?;
        reader = returned;

        if chunk?.is_none() {
            return Ok(());
        }

        item.set_progress(reader.bytes_read());
        emit(
            events,
            EngineEvent::Progress {
                id: item.id().to_string(),
                bytes_transferred: reader.bytes_read(),
                total_bytes: item.total_bytes(),
            },
        );
    }
}

/// Maps a read failure onto the retry or permanent-failure path.
fn failure_outcome(
    item: &Arc<TransferItem>,
    config: &TransferConfig,
    events: &mpsc::Sender<EngineEvent>,
    err: TransferError,
) -> AttemptOutcome {
    if item.attempt() < config.max_retries {
        let Some(attempt) = item.retry() else {
            return interrupted_outcome(item);
        };
        let delay = config.retry_delay_for(attempt);
        warn!(
            item = %item.id(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "read failed, will retry"
        );
        emit(
            events,
            EngineEvent::Retrying {
                id: item.id().to_string(),
                attempt,
                delay,
            },
        );
        emit(
            events,
            EngineEvent::StateChanged {
                id: item.id().to_string(),
                state: TransferState::Queued,
            },
        );
        return AttemptOutcome::Retry { delay };
    }

    if !item.fail(&err.to_string()) {
        return interrupted_outcome(item);
    }
    warn!(item = %item.id(), attempt = item.attempt(), error = %err, "transfer failed permanently");
    emit(
        events,
        EngineEvent::StateChanged {
            id: item.id().to_string(),
            state: TransferState::Failed,
        },
    );
    AttemptOutcome::Failed
}

/// Resolves an aborted attempt by the state the facade recorded before
/// firing the token.
fn interrupted_outcome(item: &Arc<TransferItem>) -> AttemptOutcome {
    match item.state() {
        TransferState::Paused => {
            debug!(item = %item.id(), bytes = item.snapshot().bytes_transferred, "attempt paused");
            AttemptOutcome::Paused
        }
        _ => {
            debug!(item = %item.id(), "attempt cancelled");
            AttemptOutcome::Cancelled
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> TransferError {
    TransferError::Read(std::io::Error::other(format!("task join error: {err}")))
}
