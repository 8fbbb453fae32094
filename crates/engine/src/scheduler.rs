//! Admission scheduling over the shared queue.
//!
//! Items are admitted strictly FIFO over the admission queue. A retried
//! or resumed item re-enters at the back, so its position reflects when
//! it re-entered `Queued`, not its original enqueue time. Retry backoff
//! timers run outside the processing slots: a failed item frees its slot
//! immediately and re-joins the queue once the delay elapses.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::config::{ScheduleMode, TransferConfig};
use crate::controller::{self, AttemptOutcome};
use crate::events::EngineEvent;
use crate::item::{TransferItem, TransferState};

pub(crate) type ItemList = Arc<RwLock<Vec<Arc<TransferItem>>>>;
pub(crate) type AdmissionQueue = Arc<Mutex<VecDeque<String>>>;

type Workers = JoinSet<(Arc<TransferItem>, AttemptOutcome)>;

/// Drives the queue until no item can make further progress.
///
/// Returns once every admissible item reached a terminal state; paused
/// items stay parked and do not block completion.
pub(crate) async fn run(
    items: &ItemList,
    queue: &AdmissionQueue,
    config: &Arc<TransferConfig>,
    events: &mpsc::Sender<EngineEvent>,
) {
    match config.schedule_mode {
        ScheduleMode::Continuous => run_continuous(items, queue, config, events).await,
        ScheduleMode::Batched(_) => run_batched(items, queue, config, events).await,
    }
}

/// Slot-based admission: refill as soon as a slot frees.
async fn run_continuous(
    items: &ItemList,
    queue: &AdmissionQueue,
    config: &Arc<TransferConfig>,
    events: &mpsc::Sender<EngineEvent>,
) {
    let limit = config.admission_width();
    let mut workers: Workers = JoinSet::new();
    let mut timers: JoinSet<String> = JoinSet::new();

    loop {
        while workers.len() < limit {
            let Some(item) = pop_next_queued(items, queue) else {
                break;
            };
            spawn_worker(&mut workers, item, config, events);
        }

        if workers.is_empty() && timers.is_empty() {
            break;
        }

        tokio::select! {
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                handle_worker(joined, &mut timers);
            }
            Some(joined) = timers.join_next(), if !timers.is_empty() => {
                if let Ok(id) = joined {
                    queue.lock().unwrap().push_back(id);
                }
            }
        }
    }
}

/// Whole-batch admission: await the entire batch before the next begins.
async fn run_batched(
    items: &ItemList,
    queue: &AdmissionQueue,
    config: &Arc<TransferConfig>,
    events: &mpsc::Sender<EngineEvent>,
) {
    let width = config.admission_width();
    let mut timers: JoinSet<String> = JoinSet::new();

    loop {
        let mut batch: Workers = JoinSet::new();
        while batch.len() < width {
            let Some(item) = pop_next_queued(items, queue) else {
                break;
            };
            spawn_worker(&mut batch, item, config, events);
        }

        if batch.is_empty() {
            // Nothing admissible; a pending retry may still release one.
            match timers.join_next().await {
                Some(Ok(id)) => {
                    queue.lock().unwrap().push_back(id);
                    continue;
                }
                Some(Err(err)) => {
                    error!(error = %err, "retry timer aborted");
                    continue;
                }
                None => break,
            }
        }

        debug!(size = batch.len(), "batch started");
        while let Some(joined) = batch.join_next().await {
            handle_worker(joined, &mut timers);
        }
    }
}

fn spawn_worker(
    workers: &mut Workers,
    item: Arc<TransferItem>,
    config: &Arc<TransferConfig>,
    events: &mpsc::Sender<EngineEvent>,
) {
    let config = Arc::clone(config);
    let events = events.clone();
    workers.spawn(async move {
        let outcome = controller::run_attempt(Arc::clone(&item), config, events).await;
        (item, outcome)
    });
}

fn handle_worker(
    joined: Result<(Arc<TransferItem>, AttemptOutcome), tokio::task::JoinError>,
    timers: &mut JoinSet<String>,
) {
    match joined {
        Ok((item, AttemptOutcome::Retry { delay })) => {
            let id = item.id().to_string();
            timers.spawn(async move {
                tokio::time::sleep(delay).await;
                id
            });
        }
        Ok(_) => {}
        Err(err) => {
            error!(error = %err, "transfer task aborted");
        }
    }
}

/// Pops the first id whose item still exists and is still `Queued`.
///
/// Ids whose item was removed, cancelled or paused while waiting are
/// dropped from the queue.
fn pop_next_queued(items: &ItemList, queue: &AdmissionQueue) -> Option<Arc<TransferItem>> {
    let mut q = queue.lock().unwrap();
    while let Some(id) = q.pop_front() {
        let found = items.read().unwrap().iter().find(|i| i.id() == id).cloned();
        if let Some(item) = found
            && item.state() == TransferState::Queued
        {
            return Some(item);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_item;

    fn setup(items_in: Vec<Arc<TransferItem>>) -> (ItemList, AdmissionQueue) {
        let queue: AdmissionQueue = Arc::new(Mutex::new(
            items_in.iter().map(|i| i.id().to_string()).collect(),
        ));
        let items: ItemList = Arc::new(RwLock::new(items_in));
        (items, queue)
    }

    #[tokio::test]
    async fn admits_in_insertion_order() {
        let a = sample_item("a.png", "image/png", 8);
        let b = sample_item("b.png", "image/png", 8);
        let c = sample_item("c.png", "image/png", 8);
        let (items, queue) = setup(vec![a.clone(), b.clone(), c.clone()]);

        let config = Arc::new(TransferConfig {
            concurrency: 1,
            chunk_size: 4,
            ..Default::default()
        });
        let (tx, mut rx) = mpsc::channel(256);

        run(&items, &queue, &config, &tx).await;

        let mut admitted = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let EngineEvent::Admitted { id, .. } = event {
                admitted.push(id);
            }
        }
        assert_eq!(admitted, vec![a.id(), b.id(), c.id()]);
        assert!(items
            .read()
            .unwrap()
            .iter()
            .all(|i| i.state() == TransferState::Completed));
    }

    #[tokio::test]
    async fn skips_ids_cancelled_while_queued() {
        let a = sample_item("a.png", "image/png", 8);
        let b = sample_item("b.png", "image/png", 8);
        let (items, queue) = setup(vec![a.clone(), b.clone()]);
        a.cancel().unwrap();

        let config = Arc::new(TransferConfig {
            chunk_size: 4,
            ..Default::default()
        });
        let (tx, _rx) = mpsc::channel(256);

        run(&items, &queue, &config, &tx).await;

        assert_eq!(a.state(), TransferState::Cancelled);
        assert_eq!(b.state(), TransferState::Completed);
    }

    #[tokio::test]
    async fn empty_queue_returns_immediately() {
        let (items, queue) = setup(vec![]);
        let config = Arc::new(TransferConfig::default());
        let (tx, _rx) = mpsc::channel(16);
        run(&items, &queue, &config, &tx).await;
        assert!(items.read().unwrap().is_empty());
    }
}
