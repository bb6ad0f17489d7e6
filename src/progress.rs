//! Progress-callback trait for recognition events.
//!
//! Inject an [`Arc<dyn RecognitionProgressCallback>`] via
//! [`crate::config::OcrConfigBuilder::progress_callback`] to observe a job
//! while it runs: when it is submitted, every status poll, and the final
//! outcome. The CLI uses this to drive its spinner; library callers can
//! forward the events anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_img2txt::{JobStatus, OcrConfig, RecognitionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl RecognitionProgressCallback for PollCounter {
//!     fn on_poll(&self, _title: &str, attempt: u32, _status: JobStatus) {
//!         self.0.store(attempt, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = OcrConfig::builder()
//!     .endpoint("https://ocr.example.com")
//!     .api_key("key")
//!     .progress_callback(Arc::new(PollCounter(AtomicU32::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::poll::JobStatus;
use std::sync::Arc;

/// Called by the pipeline as a document moves through its stages.
///
/// `title` identifies the document: the batch item title, the file stem for
/// [`crate::recognize::recognize_file`], or `"document"` for raw buffers.
///
/// Implementations must be `Send + Sync`; in batch mode several documents
/// report concurrently. All methods default to no-ops.
pub trait RecognitionProgressCallback: Send + Sync {
    /// The service accepted the document and returned a job handle.
    fn on_submitted(&self, title: &str, handle: &str) {
        let _ = (title, handle);
    }

    /// A status poll returned. `attempt` is 1-based.
    fn on_poll(&self, title: &str, attempt: u32, status: JobStatus) {
        let _ = (title, attempt, status);
    }

    /// Text was extracted successfully.
    fn on_complete(&self, title: &str, text_len: usize) {
        let _ = (title, text_len);
    }

    /// The document failed at any stage.
    fn on_error(&self, title: &str, error: &str) {
        let _ = (title, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RecognitionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OcrConfig`].
pub type ProgressCallback = Arc<dyn RecognitionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        submitted: AtomicUsize,
        last_poll: AtomicU32,
        completed: AtomicUsize,
        errors: AtomicUsize,
    }

    impl RecognitionProgressCallback for Tracking {
        fn on_submitted(&self, _title: &str, _handle: &str) {
            self.submitted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_poll(&self, _title: &str, attempt: u32, _status: JobStatus) {
            self.last_poll.store(attempt, Ordering::SeqCst);
        }

        fn on_complete(&self, _title: &str, _text_len: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _title: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_submitted("a", "https://x/op/1");
        cb.on_poll("a", 1, JobStatus::Running);
        cb.on_complete("a", 10);
        cb.on_error("a", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_submitted("a", "h");
        t.on_poll("a", 1, JobStatus::Running);
        t.on_poll("a", 2, JobStatus::Succeeded);
        t.on_complete("a", 42);
        t.on_error("b", "failed");

        assert_eq!(t.submitted.load(Ordering::SeqCst), 1);
        assert_eq!(t.last_poll.load(Ordering::SeqCst), 2);
        assert_eq!(t.completed.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_poll("doc", 3, JobStatus::Failed);
    }
}
