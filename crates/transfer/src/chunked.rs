use std::io::Read;

use tokio_util::sync::CancellationToken;

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// A bounded slice of a source's bytes.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Byte offset of this chunk within the source.
    pub offset: u64,
    /// Raw chunk data, at most the reader's chunk size.
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source in bounded-size chunks, honoring cancellation between
/// chunks.
///
/// The reader is finite and not restartable: a new attempt opens a fresh
/// reader from its [`ByteSource`](crate::ByteSource). The cancellation
/// token is checked before each read, so cancellation latency is bounded
/// by one chunk's read time.
pub struct ChunkReader {
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
    total_len: u64,
    bytes_read: u64,
    cancel: CancellationToken,
}

impl ChunkReader {
    /// Wraps `reader` for chunked reading of a source of `total_len` bytes.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (5 MiB) is used.
    pub fn new(
        reader: Box<dyn Read + Send>,
        total_len: u64,
        chunk_size: usize,
        cancel: CancellationToken,
    ) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            reader,
            chunk_size,
            total_len,
            bytes_read: 0,
            cancel,
        }
    }

    /// Reads the next chunk. Returns `None` once `total_len` bytes were read.
    ///
    /// Returns [`TransferError::Cancelled`] if the token fired,
    /// [`TransferError::TruncatedSource`] if the source ended early, and
    /// [`TransferError::Read`] for underlying I/O failures.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, TransferError> {
        let remaining = self.total_len - self.bytes_read;
        if remaining == 0 {
            return Ok(None);
        }

        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let want = std::cmp::min(remaining, self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; want];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            return Err(TransferError::TruncatedSource {
                got: self.bytes_read,
                expected: self.total_len,
            });
        }
        buf.truncate(n);

        let chunk = Chunk {
            offset: self.bytes_read,
            data: buf,
        };
        self.bytes_read += n as u64;
        Ok(Some(chunk))
    }

    /// Cumulative bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Total source size in bytes.
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.total_len - self.bytes_read
    }
}
