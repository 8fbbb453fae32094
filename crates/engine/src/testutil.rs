//! Shared test sources with controllable failure and pacing.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bulkferry_transfer::{ByteSource, MemorySource};

use crate::item::TransferItem;

pub(crate) fn sample_item(name: &str, content_type: &str, bytes: usize) -> Arc<TransferItem> {
    let source = Arc::new(MemorySource::new(name, content_type, vec![7u8; bytes]));
    Arc::new(TransferItem::new(
        source,
        bulkferry_transfer::default_slug(name),
        HashMap::new(),
    ))
}

/// A source whose first `fail_reads` opened readers error on `read`.
pub(crate) struct FlakySource {
    name: String,
    len: u64,
    fails_left: AtomicU32,
}

impl FlakySource {
    pub(crate) fn new(name: &str, len: u64, fail_reads: u32) -> Self {
        Self {
            name: name.to_string(),
            len,
            fails_left: AtomicU32::new(fail_reads),
        }
    }
}

impl ByteSource for FlakySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        "image/png"
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        let failing = self
            .fails_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Ok(Box::new(FailingReader))
        } else {
            Ok(Box::new(std::io::Cursor::new(vec![7u8; self.len as usize])))
        }
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("injected read failure"))
    }
}

pub(crate) fn flaky_item(name: &str, len: u64, fail_reads: u32) -> Arc<TransferItem> {
    let source = Arc::new(FlakySource::new(name, len, fail_reads));
    Arc::new(TransferItem::new(
        source,
        bulkferry_transfer::default_slug(name),
        HashMap::new(),
    ))
}

/// A source whose reader sleeps before each read, so tests can interleave
/// pause/cancel with an in-flight attempt.
pub(crate) struct SlowSource {
    name: String,
    data: Vec<u8>,
    delay: Duration,
}

impl SlowSource {
    pub(crate) fn new(name: &str, len: usize, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            data: vec![7u8; len],
            delay,
        }
    }
}

impl ByteSource for SlowSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        "image/png"
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(SlowReader {
            inner: std::io::Cursor::new(self.data.clone()),
            delay: self.delay,
        }))
    }
}

struct SlowReader {
    inner: std::io::Cursor<Vec<u8>>,
    delay: Duration,
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::thread::sleep(self.delay);
        self.inner.read(buf)
    }
}

pub(crate) fn slow_item(name: &str, len: usize, delay: Duration) -> Arc<TransferItem> {
    let source = Arc::new(SlowSource::new(name, len, delay));
    Arc::new(TransferItem::new(
        source,
        bulkferry_transfer::default_slug(name),
        HashMap::new(),
    ))
}
