//! Upload validation and staging.
//!
//! pdfium opens documents from a file-system path, so each upload is written
//! to disk before extraction. Every request gets its own `TempDir`: two
//! uploads with the same file name can never overwrite each other, and the
//! file is removed when [`StagedUpload`] is dropped, even on panic.
//!
//! Validation happens first and is cheap: file name present, `.pdf`
//! extension, non-empty body, `%PDF` magic bytes. A request that fails here
//! never reaches extraction.

use crate::error::StudyError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A validated upload written to a private temporary directory.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    filename: String,
    _temp_dir: TempDir,
}

impl StagedUpload {
    /// Path of the staged PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The original upload file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Check a file name for the supported `.pdf` extension (case-insensitive).
pub fn has_pdf_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Validate an upload without touching the file system.
pub fn validate_upload(bytes: &[u8], filename: &str) -> Result<(), StudyError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(StudyError::MissingFile);
    }
    if !has_pdf_extension(filename) {
        return Err(StudyError::UnsupportedFileType {
            filename: filename.to_string(),
        });
    }
    if bytes.is_empty() {
        return Err(StudyError::EmptyUpload {
            filename: filename.to_string(),
        });
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(StudyError::NotAPdf {
            filename: filename.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Validate an upload and write it to a fresh temporary directory.
pub async fn stage_upload(bytes: &[u8], filename: &str) -> Result<StagedUpload, StudyError> {
    validate_upload(bytes, filename)?;

    let temp_dir = tempfile::Builder::new()
        .prefix("pdf2study_")
        .tempdir()
        .map_err(|e| StudyError::Internal(format!("tempdir: {e}")))?;
    let path = temp_dir.path().join(sanitise_filename(filename));

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| StudyError::Internal(format!("Failed to write upload: {e}")))?;

    debug!("Staged upload '{}' at {}", filename, path.display());

    Ok(StagedUpload {
        path,
        filename: filename.trim().to_string(),
        _temp_dir: temp_dir,
    })
}

/// Read a local PDF for [`crate::process_file`], mapping I/O errors to input errors.
pub async fn read_local(path: &Path) -> Result<Vec<u8>, StudyError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(StudyError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(StudyError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

/// Keep only the final path component and replace characters that are
/// unsafe in file names.
fn sanitise_filename(filename: &str) -> String {
    let base = filename
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PDF: &[u8] = b"%PDF-1.7\n%fake";

    #[test]
    fn test_pdf_extension() {
        assert!(has_pdf_extension("notes.pdf"));
        assert!(has_pdf_extension("NOTES.PDF"));
        assert!(!has_pdf_extension("notes.pdf.exe"));
        assert!(!has_pdf_extension("notes"));
        assert!(!has_pdf_extension(".pdf"));
    }

    #[test]
    fn missing_filename_rejected() {
        assert!(matches!(validate_upload(PDF, ""), Err(StudyError::MissingFile)));
        assert!(matches!(validate_upload(PDF, "  "), Err(StudyError::MissingFile)));
    }

    #[test]
    fn wrong_extension_rejected() {
        let err = validate_upload(PDF, "slides.pptx").unwrap_err();
        assert!(matches!(err, StudyError::UnsupportedFileType { .. }));
    }

    #[test]
    fn empty_body_rejected() {
        let err = validate_upload(b"", "a.pdf").unwrap_err();
        assert!(matches!(err, StudyError::EmptyUpload { .. }));
    }

    #[test]
    fn bad_magic_rejected() {
        let err = validate_upload(b"PK\x03\x04zip", "a.pdf").unwrap_err();
        match err {
            StudyError::NotAPdf { magic, .. } => assert_eq!(magic, b"PK\x03\x04".to_vec()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sanitise_filename() {
        assert_eq!(sanitise_filename("../../etc/passwd.pdf"), "passwd.pdf");
        assert_eq!(sanitise_filename("C:\\docs\\week 1.pdf"), "week 1.pdf");
        assert_eq!(sanitise_filename("a:b?.pdf"), "a_b_.pdf");
        assert_eq!(sanitise_filename(".."), "upload.pdf");
    }

    #[tokio::test]
    async fn same_name_uploads_do_not_collide() {
        let a = stage_upload(b"%PDF-a", "same.pdf").await.unwrap();
        let b = stage_upload(b"%PDF-b", "same.pdf").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"%PDF-a");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"%PDF-b");
        assert_eq!(a.filename(), "same.pdf");
    }

    #[tokio::test]
    async fn staged_file_removed_on_drop() {
        let staged = stage_upload(PDF, "gone.pdf").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn read_local_missing_file() {
        let err = read_local(Path::new("/definitely/not/here.pdf")).await.unwrap_err();
        assert!(matches!(err, StudyError::FileNotFound { .. }));
    }
}
