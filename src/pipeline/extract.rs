//! Two-tier text extraction: embedded text layer first, OCR second.
//!
//! A [`TextSource`] reports absence (`None`) rather than an error: every
//! failure inside a tier is logged where it happens and collapses to "this
//! tier produced nothing". The orchestrator only needs to know whether to
//! try the next tier.

use crate::config::StudyConfig;
use crate::error::StudyError;
use crate::output::{ExtractedText, TextOrigin};
use crate::pipeline::{postprocess, render};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// One way of getting text out of a PDF on disk.
///
/// Implementations return `Some` only for non-empty text.
pub trait TextSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    fn extract(&self, pdf_path: &Path) -> impl Future<Output = Option<String>> + Send;
}

/// Run blocking pdfium work off the async runtime, bounded by `limit`.
///
/// On timeout the blocking thread is left to finish on its own; its result
/// is discarded.
pub(crate) async fn run_blocking<T, F>(limit: Duration, what: &str, f: F) -> Result<T, StudyError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StudyError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
        Err(_) => Err(StudyError::Internal(format!(
            "{what} timed out after {}s",
            limit.as_secs()
        ))),
        Ok(Err(join)) => Err(StudyError::Internal(format!("{what} task failed: {join}"))),
        Ok(Ok(result)) => result,
    }
}

/// Reads the PDF's embedded text layer.
#[derive(Debug, Clone)]
pub struct NativeExtractor {
    pdfium_lib_path: Option<PathBuf>,
    timeout: Duration,
}

impl NativeExtractor {
    pub fn from_config(config: &StudyConfig) -> Self {
        Self {
            pdfium_lib_path: config.pdfium_lib_path.clone(),
            timeout: config.render_timeout(),
        }
    }
}

impl TextSource for NativeExtractor {
    fn name(&self) -> &'static str {
        "text layer"
    }

    async fn extract(&self, pdf_path: &Path) -> Option<String> {
        let path = pdf_path.to_path_buf();
        let lib = self.pdfium_lib_path.clone();

        let pages = match run_blocking(self.timeout, "text-layer read", move || {
            render::read_text_layer(&path, lib.as_deref())
        })
        .await
        {
            Ok(pages) => pages,
            Err(e) => {
                error!("Error extracting text from PDF: {}", e);
                return None;
            }
        };

        let text = postprocess::clean_text(&pages.join("\n"));
        if text.is_empty() {
            warn!("{}: no embedded text", pdf_path.display());
            None
        } else {
            Some(text)
        }
    }
}

/// Tries `native`, and falls back to `scanned` only when it produced nothing.
#[derive(Debug, Clone)]
pub struct TextExtractor<N, S> {
    native: N,
    scanned: S,
}

impl<N: TextSource, S: TextSource> TextExtractor<N, S> {
    pub fn new(native: N, scanned: S) -> Self {
        Self { native, scanned }
    }

    /// Extract text, tagging which tier produced it. `None` means both
    /// tiers came back empty.
    pub async fn extract(&self, pdf_path: &Path) -> Option<ExtractedText> {
        if let Some(text) = non_empty(self.native.extract(pdf_path).await) {
            info!("{}: {} chars", self.native.name(), text.len());
            return Some(ExtractedText {
                text,
                origin: TextOrigin::Native,
            });
        }

        info!(
            "{} produced no text, trying {}",
            self.native.name(),
            self.scanned.name()
        );
        let text = non_empty(self.scanned.extract(pdf_path).await)?;
        info!("{}: {} chars", self.scanned.name(), text.len());
        Some(ExtractedText {
            text,
            origin: TextOrigin::Ocr,
        })
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}
