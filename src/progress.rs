//! Progress-callback trait for per-document classification events.
//!
//! Inject an [`Arc<dyn ClassificationProgressCallback>`] via
//! [`crate::config::ClassifierConfigBuilder::progress_callback`] to observe a
//! batch as it runs: a terminal progress bar, a log line per document, a
//! database row.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docclass::{ClassificationProgressCallback, ClassifierConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ClassificationProgressCallback for Counter {
//!     fn on_document_complete(&self, index: usize, path: &str, label: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("#{index} {path} → {label}");
//!     }
//! }
//!
//! let config = ClassifierConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::checkpoint::Stage;
use std::sync::Arc;

/// Called by the classifier as documents move through the stages.
///
/// Documents are processed concurrently, so every method may be called
/// from several tasks at once. All methods default to no-ops.
pub trait ClassificationProgressCallback: Send + Sync {
    /// Called once before the first document starts.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document's pipeline starts.
    ///
    /// * `index`: 0-based position in the input list
    fn on_document_start(&self, index: usize, path: &str) {
        let _ = (index, path);
    }

    /// Called after each stage produced its record.
    ///
    /// * `from_checkpoint`: `true` when the record was loaded, not computed
    fn on_stage_complete(&self, index: usize, stage: Stage, from_checkpoint: bool) {
        let _ = (index, stage, from_checkpoint);
    }

    /// Called when a document ends with a classification.
    ///
    /// * `label`: e.g. `DOCUMENTOS_COMERCIAIS/FACTURA`
    fn on_document_complete(&self, index: usize, path: &str, label: &str) {
        let _ = (index, path, label);
    }

    /// Called when a document ends with an error record.
    fn on_document_error(&self, index: usize, path: &str, error: &str) {
        let _ = (index, path, error);
    }

    /// Called once after every document was attempted.
    fn on_batch_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl ClassificationProgressCallback for NoopProgressCallback {}

/// Shared callback handle as stored in [`crate::config::ClassifierConfig`].
pub type ProgressCallback = Arc<dyn ClassificationProgressCallback>;
