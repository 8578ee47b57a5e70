//! Progress-callback trait for processing events.
//!
//! Inject an [`Arc<dyn StudyProgressCallback>`] via
//! [`crate::config::StudyConfigBuilder::progress_callback`] to receive events
//! as the pipeline extracts text and generates each field.
//!
//! # Example
//!
//! ```rust
//! use pdf2study::{StudyConfig, StudyField, StudyProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl StudyProgressCallback for CountingCallback {
//!     fn on_field_complete(&self, field: StudyField) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{field} done");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = StudyConfig::builder()
//!     .progress_callback(counter as Arc<dyn StudyProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{StudyField, TextOrigin};
use std::sync::Arc;

/// Called by the pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// config (and the callback in it) is shared across tasks.
pub trait StudyProgressCallback: Send + Sync {
    /// Called once before text extraction starts.
    fn on_extraction_start(&self, filename: &str) {
        let _ = filename;
    }

    /// Called when extraction produced text.
    ///
    /// # Arguments
    /// * `origin` - which tier produced the text
    /// * `chars`  - character count of the extracted text
    fn on_extraction_complete(&self, origin: TextOrigin, chars: usize) {
        let _ = (origin, chars);
    }

    /// Called just before the generation call for a field.
    fn on_field_start(&self, field: StudyField) {
        let _ = field;
    }

    /// Called when a field was generated successfully.
    fn on_field_complete(&self, field: StudyField) {
        let _ = field;
    }

    /// Called when a field failed (after retries, where they apply).
    fn on_field_error(&self, field: StudyField, error: &str) {
        let _ = (field, error);
    }

    /// Called before a retry of a failed attempt.
    ///
    /// # Arguments
    /// * `attempt`      - 1-indexed number of the attempt about to run
    /// * `max_attempts` - total attempts allowed
    fn on_retry(&self, field: StudyField, attempt: u32, max_attempts: u32) {
        let _ = (field, attempt, max_attempts);
    }

    /// Called once after the bundle is assembled.
    fn on_bundle_complete(&self, failed_fields: usize) {
        let _ = failed_fields;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StudyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudyConfig`].
pub type ProgressCallback = Arc<dyn StudyProgressCallback>;
