//! Page-image preprocessing for OCR: grayscale → 5×5 Gaussian blur → Otsu
//! binarisation.
//!
//! Tesseract is sensitive to noise and uneven illumination. Blurring before
//! thresholding suppresses scan speckle so it does not survive binarisation
//! as stray glyph fragments, and Otsu's method picks the global cutoff that
//! best separates ink from paper without a hand-tuned constant.

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::separable_filter_equal;
use tracing::debug;

/// Side length of the Gaussian kernel.
pub const BLUR_KERNEL_SIZE: usize = 5;

/// Produce a black/white image suitable for OCR.
///
/// Returns `None` for a degenerate (zero-sized) image; the caller skips the
/// page.
pub fn binarize(img: &DynamicImage) -> Option<GrayImage> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }

    let gray = img.to_luma8();
    let blurred = separable_filter_equal(&gray, &gaussian_kernel(BLUR_KERNEL_SIZE));
    let level = otsu_level(&blurred);
    debug!(
        "Binarising {}x{} page at Otsu level {}",
        blurred.width(),
        blurred.height(),
        level
    );

    Some(threshold(&blurred, level, ThresholdType::Binary))
}

/// Normalised 1-D Gaussian kernel of odd length `size`.
///
/// Sigma is derived from the size the way OpenCV does when sigma is left at
/// 0: `0.3 * ((size - 1) / 2 - 1) + 0.8`, i.e. 1.1 for a 5-tap kernel.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let centre = (size / 2) as f32;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f32 - centre;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}
