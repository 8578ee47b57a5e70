//! Error types for the pdf2study library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyError`] is **fatal**: the request cannot proceed at all (no file,
//!   not a PDF, neither extraction tier produced text, provider not
//!   configured). Returned as `Err(StudyError)` from the top-level `process*`
//!   functions; no partial bundle is produced.
//!
//! * [`GenerationError`] is **non-fatal**: one generation call failed (provider
//!   error, timeout, retries exhausted). Contained to the field it was meant to
//!   fill and recorded in [`crate::output::StudyBundle::failures`], so the
//!   remaining fields still populate.

use crate::output::StudyField;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix written into a text field of the bundle whose generation failed.
///
/// Only the bundle assembly writes it; the generation layer itself reports
/// failures through [`GenerationError`].
pub const ERROR_MARKER: &str = "⚠ ERROR: ";

/// All fatal errors returned by the pdf2study library.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No file was supplied (empty file name).
    #[error("No file uploaded")]
    MissingFile,

    /// The file name does not carry a supported document extension.
    #[error("Invalid file '{filename}'. Please upload a PDF.")]
    UnsupportedFileType { filename: String },

    /// The upload contained zero bytes.
    #[error("Uploaded file '{filename}' is empty")]
    EmptyUpload { filename: String },

    /// The bytes do not start with the PDF magic number.
    #[error("File is not a valid PDF: '{filename}'\nFirst bytes: {magic:?}")]
    NotAPdf { filename: String, magic: Vec<u8> },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Neither the text layer nor OCR produced any text.
    #[error("Failed to extract text from '{filename}'. Try another PDF.")]
    ExtractionFailed { filename: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationError {
    /// The provider returned an error (network, quota, auth, bad request).
    #[error("{message}")]
    Provider { message: String },

    /// The call did not complete within the configured timeout.
    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Every attempt of a retried call failed.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// A generation failure recorded against the bundle field it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    pub field: StudyField,
    pub error: GenerationError,
}

impl FieldFailure {
    /// The visible text placed into a string field in place of content.
    pub fn marker_text(&self) -> String {
        format!("{}{}", ERROR_MARKER, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_file_display() {
        let e = StudyError::UnsupportedFileType {
            filename: "notes.docx".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.docx"), "got: {msg}");
        assert!(msg.contains("PDF"));
    }

    #[test]
    fn extraction_failed_display() {
        let e = StudyError::ExtractionFailed {
            filename: "scan.pdf".into(),
        };
        assert!(e.to_string().contains("scan.pdf"));
    }

    #[test]
    fn retries_exhausted_display() {
        let e = GenerationError::RetriesExhausted {
            attempts: 5,
            last_error: "429 resource exhausted".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("5 attempts"), "got: {msg}");
        assert!(msg.contains("429"));
    }

    #[test]
    fn timeout_display() {
        let e = GenerationError::Timeout { secs: 30 };
        assert_eq!(e.to_string(), "generation timed out after 30s");
    }

    #[test]
    fn marker_text_is_prefixed() {
        let f = FieldFailure {
            field: StudyField::ShortNotes,
            error: GenerationError::Provider {
                message: "quota".into(),
            },
        };
        assert_eq!(f.marker_text(), "⚠ ERROR: quota");
    }

    #[test]
    fn generation_error_serialises_with_kind_tag() {
        let e = GenerationError::Timeout { secs: 5 };
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"kind":"timeout","secs":5}"#);
    }
}
