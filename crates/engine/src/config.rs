//! Engine configuration.

use std::time::Duration;

use bulkferry_transfer::MetadataRule;
use serde::{Deserialize, Serialize};

/// Default concurrency limit for continuous scheduling.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default batch size for [`ScheduleMode::Batched`].
pub const DEFAULT_BATCH_SIZE: usize = 3;

/// How the scheduler admits queued items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "batch_size", rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Keep up to `concurrency` items processing; refill a slot as soon
    /// as it frees. Preferred for throughput.
    Continuous,
    /// Admit items in fixed-size batches and await the whole batch before
    /// the next one begins. Simpler to reason about, under-utilizes slots
    /// when items finish early.
    Batched(usize),
}

/// Engine configuration, with the defaults of the original bulk uploader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// MIME patterns (`type/*` or exact) filtering admissible sources.
    pub accepted_file_types: Vec<String>,
    /// Cap on total items ever enqueued.
    pub max_files: usize,
    /// Bytes read per chunk.
    pub chunk_size: usize,
    /// Max simultaneously processing items (continuous mode).
    pub concurrency: usize,
    /// Admission strategy.
    pub schedule_mode: ScheduleMode,
    /// Retries before permanent failure.
    pub max_retries: u32,
    /// Delay between retry attempts.
    pub retry_delay: Duration,
    /// Double the delay on each consecutive retry of an item.
    pub exponential_backoff: bool,
    /// Ordered filename metadata extraction rules.
    pub metadata_patterns: Vec<MetadataRule>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            accepted_file_types: vec!["image/*".to_string(), "video/*".to_string()],
            max_files: 50,
            chunk_size: bulkferry_transfer::DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            schedule_mode: ScheduleMode::Continuous,
            max_retries: 5,
            retry_delay: Duration::from_millis(2000),
            exponential_backoff: false,
            metadata_patterns: Vec::new(),
        }
    }
}

impl TransferConfig {
    /// Returns the backoff delay before the given retry (1-based).
    pub fn retry_delay_for(&self, attempt: u32) -> Duration {
        if self.exponential_backoff {
            let shift = attempt.saturating_sub(1).min(16);
            self.retry_delay.saturating_mul(1 << shift)
        } else {
            self.retry_delay
        }
    }

    /// Number of items admitted together: the batch size in batched mode,
    /// the concurrency limit otherwise.
    pub fn admission_width(&self) -> usize {
        let width = match self.schedule_mode {
            ScheduleMode::Continuous => self.concurrency,
            ScheduleMode::Batched(size) => size,
        };
        width.max(1)
    }
}
