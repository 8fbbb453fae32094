//! The engine facade: batch ownership and the public operations.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bulkferry_transfer::{ByteSource, TypeFilter, default_slug, extract_metadata};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::EngineError;
use crate::config::TransferConfig;
use crate::events::{EngineEvent, emit};
use crate::item::{ItemSnapshot, TransferItem, TransferState};
use crate::scheduler;

/// Event channel capacity.
const EVENT_BUFFER: usize = 256;

/// Hook producing item metadata from a filename, overriding the
/// configured pattern rules.
pub type MetadataHook = Box<dyn Fn(&str) -> HashMap<String, String> + Send + Sync>;

/// Hook deriving a slug from a filename and the item's batch index.
pub type SlugHook = Box<dyn Fn(&str, usize) -> String + Send + Sync>;

/// Hook invoked once after a run with every item that completed.
pub type ItemsCreatedHook = Box<dyn Fn(&[ItemSnapshot]) + Send + Sync>;

/// Caller-supplied collaborators.
///
/// All optional; the engine falls back to its built-in slugifier and the
/// configured metadata rules.
#[derive(Default)]
pub struct EngineHooks {
    pub extract_metadata: Option<MetadataHook>,
    pub create_slug: Option<SlugHook>,
    pub on_items_created: Option<ItemsCreatedHook>,
}

/// Aggregate counts across the batch, computed fresh on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub total: usize,
    pub queued: usize,
    pub processing: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

/// Owns the item batch and exposes the public transfer operations.
///
/// All methods take `&self`; the engine is shared behind an `Arc` when a
/// caller needs to pause or cancel items while [`start`](Self::start) is
/// in flight.
pub struct TransferEngine {
    config: Arc<TransferConfig>,
    hooks: EngineHooks,
    filter: TypeFilter,
    items: scheduler::ItemList,
    queue: scheduler::AdmissionQueue,
    events_tx: mpsc::Sender<EngineEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<EngineEvent>>>,
    running: AtomicBool,
}

impl TransferEngine {
    /// Creates an engine with no collaborator hooks.
    pub fn new(config: TransferConfig) -> Self {
        Self::with_hooks(config, EngineHooks::default())
    }

    /// Creates an engine with the given collaborators.
    pub fn with_hooks(config: TransferConfig, hooks: EngineHooks) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let filter = TypeFilter::new(config.accepted_file_types.iter().cloned());
        Self {
            config: Arc::new(config),
            hooks,
            filter,
            items: Arc::new(RwLock::new(Vec::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            running: AtomicBool::new(false),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&self) -> Option<mpsc::Receiver<EngineEvent>> {
        self.events_rx.lock().unwrap().take()
    }

    /// Appends sources to the batch, in order.
    ///
    /// Sources failing the accepted-type filter are silently dropped, and
    /// the list is truncated so the batch never exceeds `max_files`.
    /// Returns snapshots of the created items.
    pub fn enqueue<I>(&self, sources: I) -> Vec<ItemSnapshot>
    where
        I: IntoIterator<Item = Arc<dyn ByteSource>>,
    {
        let mut created = Vec::new();
        // Lock order: queue before items, matching the scheduler.
        let mut queue = self.queue.lock().unwrap();
        let mut items = self.items.write().unwrap();

        for source in sources {
            if !self.filter.matches(source.content_type()) {
                debug!(
                    name = source.name(),
                    content_type = source.content_type(),
                    "source rejected by type filter"
                );
                continue;
            }
            if items.len() >= self.config.max_files {
                debug!(
                    max_files = self.config.max_files,
                    "file cap reached, dropping remaining sources"
                );
                break;
            }

            let filename = source.name().to_string();
            let slug = match &self.hooks.create_slug {
                Some(hook) => hook(&filename, items.len()),
                None => default_slug(&filename),
            };
            let metadata = match &self.hooks.extract_metadata {
                Some(hook) => hook(&filename),
                None => extract_metadata(&filename, &self.config.metadata_patterns),
            };

            let item = Arc::new(TransferItem::new(source, slug, metadata));
            queue.push_back(item.id().to_string());
            created.push(item.snapshot());
            items.push(item);
        }

        if !created.is_empty() {
            info!(count = created.len(), total = items.len(), "items enqueued");
        }
        created
    }

    /// Runs the batch to quiescence.
    ///
    /// Resolves once every item that can reach a terminal state has done
    /// so; paused items stay parked. Per-item failures are reported via
    /// item state, never as an `Err`. After the run, the completed subset
    /// is handed to `on_items_created`.
    pub async fn start(&self) -> Result<TransferStats, EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }

        let before = self.stats();
        info!(queued = before.queued, total = before.total, "transfer run started");

        scheduler::run(&self.items, &self.queue, &self.config, &self.events_tx).await;
        self.running.store(false, Ordering::SeqCst);

        let completed: Vec<ItemSnapshot> = self
            .snapshots()
            .into_iter()
            .filter(|s| s.state == TransferState::Completed)
            .collect();
        if let Some(hook) = &self.hooks.on_items_created
            && !completed.is_empty()
        {
            hook(&completed);
        }

        let stats = self.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            cancelled = stats.cancelled,
            paused = stats.paused,
            "transfer run finished"
        );
        Ok(stats)
    }

    /// Parks a `Processing` item, aborting its in-flight read. Bytes read
    /// so far are preserved.
    pub fn pause(&self, id: &str) -> Result<(), EngineError> {
        let item = self.find(id)?;
        match item.pause() {
            Ok(token) => {
                if let Some(token) = token {
                    token.cancel();
                }
                emit(
                    &self.events_tx,
                    EngineEvent::StateChanged {
                        id: id.to_string(),
                        state: TransferState::Paused,
                    },
                );
                info!(item = %id, "paused");
                Ok(())
            }
            Err(from) => Err(EngineError::InvalidTransition {
                id: id.to_string(),
                from,
                event: "pause",
            }),
        }
    }

    /// Re-queues a `Paused` item at the back of the admission queue.
    ///
    /// Progress is untouched while the item waits; the next admission
    /// re-reads the source from the start. If no run is active, the item
    /// is picked up by the next [`start`](Self::start).
    pub fn resume(&self, id: &str) -> Result<(), EngineError> {
        let item = self.find(id)?;
        match item.resume() {
            Ok(()) => {
                self.queue.lock().unwrap().push_back(id.to_string());
                emit(
                    &self.events_tx,
                    EngineEvent::StateChanged {
                        id: id.to_string(),
                        state: TransferState::Queued,
                    },
                );
                info!(item = %id, "resumed");
                Ok(())
            }
            Err(from) => Err(EngineError::InvalidTransition {
                id: id.to_string(),
                from,
                event: "resume",
            }),
        }
    }

    /// Cancels a non-terminal item. Terminal immediately; never retried.
    pub fn cancel(&self, id: &str) -> Result<(), EngineError> {
        let item = self.find(id)?;
        match item.cancel() {
            Ok(token) => {
                if let Some(token) = token {
                    token.cancel();
                }
                emit(
                    &self.events_tx,
                    EngineEvent::StateChanged {
                        id: id.to_string(),
                        state: TransferState::Cancelled,
                    },
                );
                info!(item = %id, "cancelled");
                Ok(())
            }
            Err(from) => Err(EngineError::InvalidTransition {
                id: id.to_string(),
                from,
                event: "cancel",
            }),
        }
    }

    /// Deletes an item from the batch, cancelling it first if in flight.
    pub fn remove(&self, id: &str) -> Result<(), EngineError> {
        let item = self.find(id)?;
        if let Ok(Some(token)) = item.cancel() {
            token.cancel();
        }

        let mut items = self.items.write().unwrap();
        items.retain(|i| i.id() != id);
        info!(item = %id, "removed");
        Ok(())
    }

    /// Cancels every non-terminal item, then empties the batch.
    pub fn clear_all(&self) {
        // Lock order: queue before items, matching the scheduler.
        let mut queue = self.queue.lock().unwrap();
        let mut items = self.items.write().unwrap();
        for item in items.iter() {
            if let Ok(token) = item.cancel() {
                if let Some(token) = token {
                    token.cancel();
                }
                emit(
                    &self.events_tx,
                    EngineEvent::StateChanged {
                        id: item.id().to_string(),
                        state: TransferState::Cancelled,
                    },
                );
            }
        }
        let count = items.len();
        items.clear();
        queue.clear();
        info!(count, "batch cleared");
    }

    /// Aggregate counts, computed fresh from the current item list.
    pub fn stats(&self) -> TransferStats {
        let items = self.items.read().unwrap();
        let mut stats = TransferStats::default();
        for item in items.iter() {
            let snap = item.snapshot();
            stats.total += 1;
            match snap.state {
                TransferState::Queued => stats.queued += 1,
                TransferState::Processing => stats.processing += 1,
                TransferState::Paused => stats.paused += 1,
                TransferState::Completed => stats.completed += 1,
                TransferState::Failed => stats.failed += 1,
                TransferState::Cancelled => stats.cancelled += 1,
            }
            stats.bytes_transferred += snap.bytes_transferred;
            stats.total_bytes += snap.total_bytes;
        }
        stats
    }

    /// Item snapshots in display (insertion) order.
    pub fn snapshots(&self) -> Vec<ItemSnapshot> {
        self.items
            .read()
            .unwrap()
            .iter()
            .map(|i| i.snapshot())
            .collect()
    }

    fn find(&self, id: &str) -> Result<Arc<TransferItem>, EngineError> {
        self.items
            .read()
            .unwrap()
            .iter()
            .find(|i| i.id() == id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownItem(id.to_string()))
    }
}
