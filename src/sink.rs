//! Page sinks: where encoded page images end up.
//!
//! The pipeline hands each page to a [`PageSink`] together with the key it
//! computed (`{prefix}/{filename}-{page}.{ext}`). A sink returns a location
//! handle for logs and progress events: a filesystem path, an `s3://` URI,
//! or the bare key.

use crate::error::Doc2PagesError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Destination for encoded pages.
///
/// Implementations must be `Send + Sync`: pages are stored concurrently.
#[async_trait]
pub trait PageSink: Send + Sync {
    /// Persist one page under `key` and return where it went.
    async fn store(
        &self,
        page: usize,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Doc2PagesError>;
}

// ── Directory ────────────────────────────────────────────────────────────

/// Writes pages as files under a root directory.
///
/// Keys containing `/` create subdirectories. Each file is written to a
/// temporary sibling and renamed into place, so readers never see a
/// half-written image.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
            .fold(self.root.clone(), |path, seg| path.join(seg))
    }
}

#[async_trait]
impl PageSink for DirectorySink {
    async fn store(
        &self,
        _page: usize,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, Doc2PagesError> {
        let path = self.path_for(key);
        let write_failed = |source| Doc2PagesError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &bytes).await.map_err(write_failed)?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_failed)?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path.display().to_string())
    }
}

// ── Memory ───────────────────────────────────────────────────────────────

/// One page held by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub page: usize,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Keeps pages in memory, keyed by storage key.
#[derive(Debug, Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take every stored page, leaving the sink empty.
    pub fn drain(&self) -> BTreeMap<String, StoredObject> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PageSink for MemorySink {
    async fn store(
        &self,
        page: usize,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, Doc2PagesError> {
        self.lock().insert(
            key.to_string(),
            StoredObject {
                page,
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(key.to_string())
    }
}

// ── S3 ───────────────────────────────────────────────────────────────────

#[cfg(feature = "s3")]
pub use s3::S3Sink;

#[cfg(feature = "s3")]
mod s3 {
    use super::PageSink;
    use crate::error::Doc2PagesError;
    use async_trait::async_trait;
    use aws_sdk_s3::primitives::ByteStream;
    use tracing::debug;

    /// Uploads pages to an S3 bucket with `put_object`.
    #[derive(Debug, Clone)]
    pub struct S3Sink {
        client: aws_sdk_s3::Client,
        bucket: String,
    }

    impl S3Sink {
        pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
            Self {
                client,
                bucket: bucket.into(),
            }
        }

        pub fn bucket(&self) -> &str {
            &self.bucket
        }
    }

    #[async_trait]
    impl PageSink for S3Sink {
        async fn store(
            &self,
            page: usize,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<String, Doc2PagesError> {
            let location = format!("s3://{}/{}", self.bucket, key);
            let len = bytes.len();

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(bytes))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| Doc2PagesError::StoreFailed {
                    page,
                    location: location.clone(),
                    detail: aws_sdk_s3::error::DisplayErrorContext(&e).to_string(),
                })?;

            debug!("Uploaded {} bytes to {}", len, location);
            Ok(location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sink_keeps_bytes_and_content_type() {
        let sink = MemorySink::new();
        let loc = sink
            .store(1, "out/doc-1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(loc, "out/doc-1.png");
        let obj = sink.get("out/doc-1.png").unwrap();
        assert_eq!(obj.page, 1);
        assert_eq!(obj.bytes, vec![1, 2, 3]);
        assert_eq!(obj.content_type, "image/png");
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn memory_sink_drain_empties_it() {
        let sink = MemorySink::new();
        sink.store(2, "b", vec![], "image/png").await.unwrap();
        sink.store(1, "a", vec![], "image/png").await.unwrap();
        let drained = sink.drain();
        assert_eq!(drained.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn directory_sink_creates_prefix_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        let loc = sink
            .store(3, "images/report-3.png", b"png".to_vec(), "image/png")
            .await
            .unwrap();

        let expected = dir.path().join("images").join("report-3.png");
        assert_eq!(loc, expected.display().to_string());
        assert_eq!(std::fs::read(&expected).unwrap(), b"png");
        assert!(!dir.path().join("images").join("report-3.png.tmp").exists());
    }

    #[tokio::test]
    async fn directory_sink_overwrites_existing_page() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.store(1, "a-1.png", b"old".to_vec(), "image/png").await.unwrap();
        sink.store(1, "a-1.png", b"new".to_vec(), "image/png").await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("a-1.png")).unwrap(), b"new");
    }

    #[test]
    fn directory_sink_never_escapes_root() {
        let sink = DirectorySink::new("/out");
        assert_eq!(sink.path_for("../../etc/x.png"), Path::new("/out/etc/x.png"));
        assert_eq!(sink.path_for("/abs//y.png"), Path::new("/out/abs/y.png"));
    }
}
