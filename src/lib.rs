//! # pdf2study
//!
//! Turn a PDF into study material: a summary, flashcards, multiple-choice
//! questions and short notes, generated by an LLM from the document's text.
//!
//! ## Why two extraction tiers?
//!
//! Most lecture PDFs carry an embedded text layer, which pdfium reads
//! instantly and exactly. Scanned handouts do not, so when the text layer is
//! empty each page is rendered at 400 DPI, cleaned up (grayscale, Gaussian
//! blur, Otsu threshold) and read by tesseract. OCR only runs when the text
//! layer produced nothing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input     validate name, extension and magic bytes; stage in a temp dir
//!  ├─ 2. Extract   pdfium text layer, else render → binarise → tesseract
//!  ├─ 3. Generate  summary, flashcards, MCQs, short notes (notes retried)
//!  ├─ 4. Parse     blank-line-delimited blocks → typed records
//!  └─ 5. Output    StudyBundle (+ per-field failures)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2study::{process_file, StudyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ...
//!     let config = StudyConfig::default();
//!     let bundle = process_file("lecture.pdf", &config).await?;
//!     println!("{}", bundle.summary);
//!     for card in &bundle.flashcards {
//!         println!("Q: {}\nA: {}\n", card.front, card.back);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2study` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Runtime requirements
//!
//! - `libpdfium` next to the binary, installed system-wide, or pointed to by
//!   [`StudyConfig::pdfium_lib_path`].
//! - `tesseract` with the configured language data, for scanned PDFs only.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{McqAnswerSelection, OcrConfig, RetryPolicy, StudyConfig, StudyConfigBuilder};
pub use error::{FieldFailure, GenerationError, StudyError, ERROR_MARKER};
pub use output::{ExtractedText, Flashcard, Mcq, StudyBundle, StudyField, TextOrigin};
pub use pipeline::extract::{NativeExtractor, TextSource};
pub use pipeline::llm::{Generator, LlmGenerator};
pub use pipeline::ocr::ScannedExtractor;
pub use pipeline::parse::{parse_flashcards, parse_mcqs, AnswerRule, LastOption, MarkedAnswer};
pub use process::{
    extract_text, process, process_file, process_sync, process_to_file, resolve_provider,
    DefaultPipeline, StudyPipeline,
};
pub use progress::{NoopProgressCallback, ProgressCallback, StudyProgressCallback};
