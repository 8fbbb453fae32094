//! Byte sources, cancellation-aware chunked reading and filename metadata
//! extraction for bulk ingestion.

mod accept;
mod chunked;
mod metadata;
mod naming;
mod source;

pub use accept::TypeFilter;
pub use chunked::{Chunk, ChunkReader};
pub use metadata::{MetadataRule, extract_metadata};
pub use naming::default_slug;
pub use source::{ByteSource, FileSource, MemorySource, detect_content_type};

/// Default chunk size: 5 MiB.
///
/// Larger chunks reduce per-chunk overhead (syscalls, progress publishes)
/// at the cost of coarser cancellation latency, since the token is only
/// checked between chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Errors produced while reading a source in chunks.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("source ended early: got {got} of {expected} bytes")]
    TruncatedSource { got: u64, expected: u64 },

    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// Returns `true` for failures worth retrying. Cancellation is
    /// user-initiated and never retried.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, TransferError::Cancelled)
    }
}
