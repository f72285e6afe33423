//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] into
//! [`crate::run::Pipeline::with_progress`] to receive events as the driver
//! works through the batch. A document is *pending* until
//! `on_document_start`, *processing* until `on_document_complete` (done) or
//! `on_document_error` (failed).
//!
//! # Example
//!
//! ```rust
//! use pdf2canvas::BatchProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, canvas_path: &str) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} → {}", index, total, canvas_path);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based. Documents are processed one at
/// a time, so calls never overlap.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after documents are located, before the first one starts.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when a document leaves the pending state.
    fn on_document_start(&self, index: usize, total: usize, path: &str) {
        let _ = (index, total, path);
    }

    /// Called when a document's text is larger than the length budget.
    fn on_length_warning(&self, path: &str, chars: usize, budget: usize) {
        let _ = (path, chars, budget);
    }

    /// Called when a document's canvas has been written.
    fn on_document_complete(&self, index: usize, total: usize, canvas_path: &str) {
        let _ = (index, total, canvas_path);
    }

    /// Called when a document fails.
    fn on_document_error(&self, index: usize, total: usize, path: &str, error: &str) {
        let _ = (index, total, path, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
