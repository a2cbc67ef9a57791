//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as each page image is encoded and stored.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doc2pages::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     stored: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_stored(&self, page_num: usize, total_pages: usize, key: &str) {
//!         self.stored.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} -> {}", page_num, total_pages, key);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { stored: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it stores each page.
///
/// Pages are encoded and stored concurrently, so `on_page_stored` and
/// `on_page_error` may arrive out of page order and from different threads.
/// All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after layout or rasterisation, before any page is stored.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page has been encoded and written to the sink.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    /// * `key`        : storage key the page was written under
    fn on_page_stored(&self, page_num: usize, total_pages: usize, key: &str) {
        let _ = (page_num, total_pages, key);
    }

    /// Called when encoding or storing a page fails.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        total: AtomicUsize,
        keys: Mutex<Vec<String>>,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_conversion_start(&self, total_pages: usize) {
            self.total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_stored(&self, _page_num: usize, _total_pages: usize, key: &str) {
            self.keys.lock().unwrap().push(key.to_string());
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _total_pages: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_accepts_every_event() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(2);
        cb.on_page_stored(1, 2, "a-1.png");
        cb.on_page_error(2, 2, "disk full");
        cb.on_conversion_complete(2, 1);
    }

    #[test]
    fn recorder_sees_keys_and_counts() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();

        cb.on_conversion_start(3);
        cb.on_page_stored(2, 3, "out/doc-2.png");
        cb.on_page_stored(1, 3, "out/doc-1.png");
        cb.on_page_error(3, 3, "upload refused");
        cb.on_conversion_complete(3, 2);

        assert_eq!(rec.total.load(Ordering::SeqCst), 3);
        assert_eq!(
            *rec.keys.lock().unwrap(),
            vec!["out/doc-2.png".to_string(), "out/doc-1.png".to_string()]
        );
        assert_eq!(rec.errors.load(Ordering::SeqCst), 1);
        assert_eq!(rec.succeeded.load(Ordering::SeqCst), 2);
    }
}
