//! Byte-source seam between the engine and whatever produces file data.
//!
//! Each transfer attempt calls [`ByteSource::open`] for a fresh reader, so
//! a retried or resumed item re-reads from the start. Callers bring their
//! own implementation or use [`FileSource`]/[`MemorySource`].

use std::io::Read;
use std::path::{Path, PathBuf};

/// A named, typed, re-openable stream of bytes.
pub trait ByteSource: Send + Sync {
    /// The original filename, used for slug and metadata derivation.
    fn name(&self) -> &str;

    /// MIME content type (`image/png`, `video/mp4`, ...). Empty when unknown.
    fn content_type(&self) -> &str;

    /// Total size in bytes. Fixed for the lifetime of the source.
    fn len(&self) -> u64;

    /// Returns `true` if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a fresh reader positioned at the start of the source.
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>>;
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A filesystem-backed source.
///
/// Size is captured at construction; content type is detected from the
/// file extension.
pub struct FileSource {
    path: PathBuf,
    name: String,
    content_type: String,
    len: u64,
}

impl FileSource {
    /// Opens `path` and captures its metadata.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let len = std::fs::metadata(path)?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = detect_content_type(&name).unwrap_or_default().to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            content_type,
            len,
        })
    }

    /// The underlying filesystem path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::fs::File::open(&self.path)?))
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

/// An in-memory source with explicit name and content type.
pub struct MemorySource {
    name: String,
    content_type: String,
    data: Vec<u8>,
}

impl MemorySource {
    /// Wraps `data` under the given name and content type.
    pub fn new(name: &str, content_type: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn open(&self) -> std::io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::io::Cursor::new(self.data.clone())))
    }
}

/// Detects MIME content type from a file path extension.
pub fn detect_content_type(path: &str) -> Option<&'static str> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("webp") => Some("image/webp"),
        Some("gif") => Some("image/gif"),
        Some("svg") => Some("image/svg+xml"),
        Some("ico") => Some("image/x-icon"),
        Some("mp4") => Some("video/mp4"),
        Some("webm") => Some("video/webm"),
        Some("mov") => Some("video/quicktime"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("pdf") => Some("application/pdf"),
        Some("json") => Some("application/json"),
        Some("md") => Some("text/markdown"),
        Some("txt") => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_captures_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"not really a png").unwrap();

        let source = FileSource::new(&path).unwrap();
        assert_eq!(source.name(), "photo.png");
        assert_eq!(source.content_type(), "image/png");
        assert_eq!(source.len(), 16);
        assert!(!source.is_empty());
    }

    #[test]
    fn file_source_unknown_extension_has_empty_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.xyz");
        std::fs::write(&path, b"x").unwrap();

        let source = FileSource::new(&path).unwrap();
        assert_eq!(source.content_type(), "");
    }

    #[test]
    fn file_source_reopens_from_start() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let source = FileSource::new(&path).unwrap();
        for _ in 0..2 {
            let mut reader = source.open().unwrap();
            let mut buf = String::new();
            reader.read_to_string(&mut buf).unwrap();
            assert_eq!(buf, "hello");
        }
    }

    #[test]
    fn memory_source_roundtrip() {
        let source = MemorySource::new("clip.mp4", "video/mp4", b"AABB".to_vec());
        assert_eq!(source.name(), "clip.mp4");
        assert_eq!(source.content_type(), "video/mp4");
        assert_eq!(source.len(), 4);

        let mut buf = Vec::new();
        source.open().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"AABB");
    }

    #[test]
    fn detect_content_type_common_cases() {
        assert_eq!(detect_content_type("a.PNG"), Some("image/png"));
        assert_eq!(detect_content_type("b.jpeg"), Some("image/jpeg"));
        assert_eq!(detect_content_type("c.mp4"), Some("video/mp4"));
        assert_eq!(detect_content_type("noext"), None);
        assert_eq!(detect_content_type("weird.zzz"), None);
    }
}
