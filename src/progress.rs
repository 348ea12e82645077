//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch driver works through the document set.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a terminal progress bar
//! without the library knowing how the host application communicates. The
//! batch is single-threaded, but the trait is `Send + Sync` so the same
//! callback value can be shared with other tasks (e.g. a UI thread).

use crate::record::BatchSummary;
use std::sync::Arc;

/// Shared handle to a progress callback.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Called by the batch driver as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// A document's pipeline is starting.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// A document completed; `rows` is how many rows it contributed.
    fn on_document_complete(&self, index: usize, total: usize, name: &str, rows: usize) {
        let _ = (index, total, name, rows);
    }

    /// A document failed and was diverted to the error trail.
    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after the last document.
    fn on_batch_complete(&self, summary: &BatchSummary) {
        let _ = summary;
    }
}
