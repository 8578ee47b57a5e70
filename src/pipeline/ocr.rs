//! Scanned-page extraction: rasterise → binarise → tesseract.
//!
//! Pages are rendered and binarised on a blocking thread and written to a
//! per-request work directory as PNG. Each path goes over a channel to the
//! async side, which runs the tesseract CLI on it while the next page
//! renders. Each page image is dropped as soon as it is written; each PNG is
//! deleted as soon as it has been recognised.
//!
//! A page that cannot be binarised or recognised is skipped. A renderer that
//! produces no page within the per-page timeout ends the document, keeping
//! the pages already recognised. pdfium missing, a corrupt document or a
//! missing tesseract stop the whole tier and are reported as absence.

use crate::config::{OcrConfig, StudyConfig};
use crate::error::StudyError;
use crate::pipeline::extract::TextSource;
use crate::pipeline::{postprocess, preprocess, render};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Failure of one tesseract invocation.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The configured executable does not exist.
    #[error("tesseract not found at '{}'. Install tesseract-ocr or set --tesseract.", cmd.display())]
    NotInstalled { cmd: PathBuf },

    /// The process could not be started.
    #[error("failed to start tesseract: {0}")]
    Spawn(#[source] std::io::Error),

    /// tesseract exited unsuccessfully.
    #[error("tesseract exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// tesseract did not finish within the per-page timeout.
    #[error("tesseract timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Run tesseract on one image and return its raw stdout text.
///
/// Invoked as `tesseract <image> stdout --oem <mode> --psm <mode> -l <lang>`.
/// The child is killed if the timeout expires or the future is dropped.
pub async fn recognize(ocr: &OcrConfig, image_path: &Path) -> Result<String, OcrError> {
    let mut cmd = Command::new(&ocr.tesseract_cmd);
    cmd.arg(image_path)
        .arg("stdout")
        .arg("--oem")
        .arg(ocr.engine_mode.to_string())
        .arg("--psm")
        .arg(ocr.page_seg_mode.to_string())
        .arg("-l")
        .arg(&ocr.language)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(ocr.timeout(), cmd.output()).await {
        Err(_) => {
            return Err(OcrError::Timeout {
                secs: ocr.timeout_secs,
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OcrError::NotInstalled {
                cmd: ocr.tesseract_cmd.clone(),
            })
        }
        Ok(Err(e)) => return Err(OcrError::Spawn(e)),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        return Err(OcrError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Recognise page images in the order they arrive on `pages`.
///
/// Each PNG is deleted once recognised. A page whose tesseract run fails is
/// skipped. When no page arrives within `stall`, the pages recognised so far
/// are kept and the rest are given up on. Page texts are joined with `\n`
/// and cleaned; `Ok(None)` means no page produced text. Only a missing
/// tesseract binary is an error.
pub async fn recognize_pages(
    ocr: &OcrConfig,
    pages: &mut mpsc::Receiver<PathBuf>,
    stall: Duration,
) -> Result<Option<String>, OcrError> {
    let mut page_texts = Vec::new();
    loop {
        let png = match tokio::time::timeout(stall, pages.recv()).await {
            Ok(Some(png)) => png,
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "No page rendered within {}s; keeping {} recognised pages",
                    stall.as_secs(),
                    page_texts.len()
                );
                break;
            }
        };

        let result = recognize(ocr, &png).await;
        let _ = tokio::fs::remove_file(&png).await;
        match result {
            Ok(text) => {
                debug!("{}: {} chars", png.display(), text.len());
                page_texts.push(text);
            }
            Err(e @ OcrError::NotInstalled { .. }) => return Err(e),
            Err(e) => warn!("Skipping {}: {}", png.display(), e),
        }
    }

    let text = postprocess::clean_text(&page_texts.join("\n"));
    Ok((!text.is_empty()).then_some(text))
}

/// OCR tier of the extraction pipeline.
#[derive(Debug, Clone)]
pub struct ScannedExtractor {
    dpi: u32,
    max_rendered_pixels: u32,
    pdfium_lib_path: Option<PathBuf>,
    page_timeout: Duration,
    ocr: OcrConfig,
}

impl ScannedExtractor {
    pub fn from_config(config: &StudyConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_rendered_pixels: config.max_rendered_pixels,
            pdfium_lib_path: config.pdfium_lib_path.clone(),
            page_timeout: config.render_timeout(),
            ocr: config.ocr.clone(),
        }
    }

    /// Render and binarise pages on a blocking thread, sending each PNG path
    /// into `pages` as soon as it is written. Stops early once the receiver
    /// is gone.
    fn spawn_renderer(
        &self,
        pdf_path: &Path,
        work_dir: &Path,
        pages: mpsc::Sender<PathBuf>,
    ) -> JoinHandle<Result<usize, StudyError>> {
        let path = pdf_path.to_path_buf();
        let out_dir = work_dir.to_path_buf();
        let lib = self.pdfium_lib_path.clone();
        let (dpi, max_px) = (self.dpi, self.max_rendered_pixels);

        tokio::task::spawn_blocking(move || {
            render::render_each_page(&path, lib.as_deref(), dpi, max_px, |idx, image| {
                if pages.is_closed() {
                    return ControlFlow::Break(());
                }
                let Some(binary) = preprocess::binarize(&image) else {
                    warn!("Skipping page {}: preprocessing failed", idx + 1);
                    return ControlFlow::Continue(());
                };
                let png = out_dir.join(format!("page-{:04}.png", idx + 1));
                if let Err(e) = binary.save(&png) {
                    warn!("Skipping page {}: cannot write image: {}", idx + 1, e);
                    return ControlFlow::Continue(());
                }
                match pages.blocking_send(png) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(_) => ControlFlow::Break(()),
                }
            })
        })
    }

    async fn run(&self, pdf_path: &Path) -> Result<Option<String>, StudyError> {
        let work_dir = tempfile::Builder::new()
            .prefix("pdf2study_ocr_")
            .tempdir()
            .map_err(|e| StudyError::Internal(format!("tempdir: {e}")))?;

        info!("OCR processing {}...", pdf_path.display());
        let (tx, mut rx) = mpsc::channel(1);
        let renderer = self.spawn_renderer(pdf_path, work_dir.path(), tx);

        let text = recognize_pages(&self.ocr, &mut rx, self.page_timeout)
            .await
            .map_err(|e| StudyError::Internal(e.to_string()))?;

        // Closed channel: the renderer has returned. Otherwise it stalled and
        // is left to notice the dropped receiver on its own.
        let finished = matches!(rx.try_recv(), Err(TryRecvError::Disconnected));
        drop(rx);
        if text.is_none() && finished {
            renderer
                .await
                .map_err(|e| StudyError::Internal(format!("page rendering task failed: {e}")))??;
        }
        Ok(text)
    }
}

impl TextSource for ScannedExtractor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    async fn extract(&self, pdf_path: &Path) -> Option<String> {
        match self.run(pdf_path).await {
            Ok(text) => text,
            Err(e) => {
                error!("Error performing OCR on scanned PDF: {}", e);
                None
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Run `sh <script>` in place of tesseract: the "image" is a shell script,
    /// and tesseract's remaining arguments land in `$@`.
    fn sh_config(timeout_secs: u64) -> OcrConfig {
        OcrConfig {
            tesseract_cmd: PathBuf::from("sh"),
            timeout_secs,
            ..OcrConfig::default()
        }
    }

    fn script(dir: &Path, body: &str) -> PathBuf {
        page_script(dir, 0, body)
    }

    fn page_script(dir: &Path, n: usize, body: &str) -> PathBuf {
        let path = dir.join(format!("page-{n:04}.png"));
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Queue `bodies` as page images and close the channel.
    fn queued_pages(dir: &Path, bodies: &[&str]) -> (mpsc::Receiver<PathBuf>, Vec<PathBuf>) {
        let (tx, rx) = mpsc::channel(bodies.len().max(1));
        let paths: Vec<PathBuf> = bodies
            .iter()
            .enumerate()
            .map(|(n, body)| page_script(dir, n + 1, body))
            .collect();
        for path in &paths {
            tx.try_send(path.clone()).unwrap();
        }
        (rx, paths)
    }

    #[tokio::test]
    async fn passes_engine_and_segmentation_modes() {
        let dir = tempfile::tempdir().unwrap();
        let img = script(dir.path(), "echo \"$@\"");
        let out = recognize(&sh_config(10), &img).await.unwrap();
        assert_eq!(out.trim(), "stdout --oem 3 --psm 3 -l eng");
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let img = script(dir.path(), "echo 'bad image' >&2; exit 1");
        match recognize(&sh_config(10), &img).await {
            Err(OcrError::Failed { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "bad image");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_reported() {
        let ocr = OcrConfig {
            tesseract_cmd: PathBuf::from("/nonexistent/tesseract"),
            ..OcrConfig::default()
        };
        let err = recognize(&ocr, Path::new("page.png")).await.unwrap_err();
        assert!(matches!(err, OcrError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn hung_process_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let img = script(dir.path(), "sleep 30");
        let err = recognize(&sh_config(1), &img).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout { secs: 1 }));
    }

    #[tokio::test]
    async fn pages_joined_in_order_skipping_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (mut rx, paths) = queued_pages(
            dir.path(),
            &[
                "echo 'unreadable' >&2; exit 1",
                "printf '\\n  page one\\n'",
                "",
                "printf 'page two\\f'",
            ],
        );

        let text = recognize_pages(&sh_config(10), &mut rx, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("page one\n\npage two"));
        assert!(paths.iter().all(|p| !p.exists()), "page images are deleted");
    }

    #[tokio::test]
    async fn all_empty_pages_is_absence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut rx, _) = queued_pages(dir.path(), &["", "printf '  \\f'"]);
        let text = recognize_pages(&sh_config(10), &mut rx, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn missing_tesseract_stops_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let (mut rx, _) = queued_pages(dir.path(), &["printf 'text'"]);
        let ocr = OcrConfig {
            tesseract_cmd: PathBuf::from("/nonexistent/tesseract"),
            ..OcrConfig::default()
        };
        let err = recognize_pages(&ocr, &mut rx, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::NotInstalled { .. }));
    }

    #[tokio::test]
    async fn stalled_renderer_keeps_recognised_pages() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(page_script(dir.path(), 1, "printf 'page one'"))
            .await
            .unwrap();

        // Sender stays open without sending another page.
        let text = recognize_pages(&sh_config(10), &mut rx, Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(text.as_deref(), Some("page one"));
        drop(tx);
    }
}
