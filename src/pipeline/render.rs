//! pdfium access: library binding, text-layer reads, page rasterisation.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to call from async contexts. Every function here is
//! blocking and is driven from `tokio::task::spawn_blocking` by the
//! extractors, with waits bounded by
//! [`crate::config::StudyConfig::render_timeout_secs`].
//!
//! ## Why scale, then cap pixels?
//!
//! OCR wants a fixed physical resolution (DPI), so pages are scaled by
//! `dpi / 72` (PDF user space is 72 units per inch). The pixel cap only bites
//! on oversized pages, where an uncapped 400-DPI render would allocate
//! hundreds of megabytes.

use crate::error::StudyError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::ops::ControlFlow;
use std::path::Path;
use tracing::{debug, info, warn};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

const PDFIUM_HINT: &str = "Place libpdfium next to the binary, install it system-wide, or \
set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium.";

/// Bind to pdfium: the configured directory if any, else the working
/// directory, else the system library.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, StudyError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| {
        StudyError::Internal(format!("Failed to bind to pdfium library: {e:?}. {PDFIUM_HINT}"))
    })?;

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, StudyError> {
    pdfium.load_pdf_from_file(pdf_path, None).map_err(|e| {
        StudyError::Internal(format!("Failed to open '{}': {:?}", pdf_path.display(), e))
    })
}

/// Read the embedded text of every page that has a text layer.
///
/// Returns the per-page texts in page order; pages without text are left
/// out. Fails only when pdfium cannot be bound or the document cannot be
/// opened.
pub fn read_text_layer(pdf_path: &Path, lib_dir: Option<&Path>) -> Result<Vec<String>, StudyError> {
    let pdfium = bind_pdfium(lib_dir)?;
    let document = open_document(&pdfium, pdf_path)?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::new();
    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => {
                let page_text = text.all();
                if page_text.trim().is_empty() {
                    debug!("Page {}: no text layer", idx + 1);
                } else {
                    texts.push(page_text);
                }
            }
            Err(e) => debug!("Page {}: text layer unreadable: {:?}", idx + 1, e),
        }
    }

    Ok(texts)
}

/// Rasterise every page at `dpi` and hand each image to `on_page` in page
/// order, together with its 0-based index.
///
/// Only one page image is alive at a time: it is dropped as soon as
/// `on_page` returns. Pages that fail to render are logged and skipped;
/// `ControlFlow::Break` from `on_page` stops the loop. Returns the number of
/// pages in the document.
pub fn render_each_page<F>(
    pdf_path: &Path,
    lib_dir: Option<&Path>,
    dpi: u32,
    max_pixels: u32,
    mut on_page: F,
) -> Result<usize, StudyError>
where
    F: FnMut(usize, DynamicImage) -> ControlFlow<()>,
{
    let pdfium = bind_pdfium(lib_dir)?;
    let document = open_document(&pdfium, pdf_path)?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("Rendering {} pages at {} DPI", total_pages, dpi);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = match page.render_with_config(&render_config) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("Skipping page {}: rasterisation failed: {:?}", idx + 1, e);
                continue;
            }
        };

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        if on_page(idx, image).is_break() {
            debug!("Rendering stopped after page {}", idx + 1);
            break;
        }
    }

    Ok(total_pages)
}
