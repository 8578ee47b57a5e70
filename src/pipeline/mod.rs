//! Pipeline stages for PDF-to-study-material generation.
//!
//! Each submodule implements one step. The two seams, [`extract::TextSource`]
//! and [`llm::Generator`], let each side be swapped for a stub in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──┬─▶ native (text layer)
//! (stage)             └─▶ ocr ──▶ render ──▶ preprocess ──▶ tesseract
//!                                 (pdfium)   (blur + Otsu)
//!
//! text ──▶ prompts ──▶ llm ──▶ postprocess ──▶ parse ──▶ StudyBundle
//! ```
//!
//! 1. [`input`]   - validate the upload and stage it in a private temp dir
//! 2. [`extract`] - text layer first, OCR only when that produced nothing
//! 3. [`render`]  - pdfium access; blocking, always run via `spawn_blocking`
//! 4. [`preprocess`] - grayscale, 5×5 Gaussian blur, Otsu threshold
//! 5. [`ocr`]     - tesseract CLI per page
//! 6. [`llm`]     - one provider call per prompt; retry for short notes
//! 7. [`postprocess`] - normalise extracted text and model responses
//! 8. [`parse`]   - blank-line-delimited blocks → flashcards and MCQs

pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod render;
