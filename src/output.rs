//! Output types: the study bundle and the records inside it.
//!
//! All types are `Serialize` so the CLI (and any HTTP layer in front of the
//! library) can emit them as JSON unchanged:
//!
//! ```json
//! { "summary": "…",
//!   "flashcards": [{ "front": "…", "back": "…" }],
//!   "mcqs": [{ "question": "…", "options": ["…","…","…","…"], "answer": "…" }],
//!   "short_notes": "…" }
//! ```

use crate::error::FieldFailure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One question/answer card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// One multiple-choice question with exactly four options.
///
/// `answer` is always one of `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mcq {
    pub question: String,
    pub options: [String; 4],
    pub answer: String,
}

/// The aggregate result for one processed document.
///
/// Assembled once, after all four generation calls completed or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyBundle {
    pub summary: String,
    pub flashcards: Vec<Flashcard>,
    pub mcqs: Vec<Mcq>,
    pub short_notes: String,
    /// Fields whose generation failed. Omitted from JSON when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FieldFailure>,
}

impl StudyBundle {
    /// `true` when every field was generated without error.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the given field failed.
    pub fn has_failed(&self, field: StudyField) -> bool {
        self.failures.iter().any(|f| f.field == field)
    }
}

/// The four generated fields of a [`StudyBundle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyField {
    Summary,
    Flashcards,
    Mcqs,
    ShortNotes,
}

impl fmt::Display for StudyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StudyField::Summary => "summary",
            StudyField::Flashcards => "flashcards",
            StudyField::Mcqs => "mcqs",
            StudyField::ShortNotes => "short_notes",
        };
        f.write_str(name)
    }
}

/// Which extraction tier produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrigin {
    /// Embedded text layer.
    Native,
    /// Rendered pages run through OCR.
    Ocr,
}

impl fmt::Display for TextOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrigin::Native => f.write_str("text layer"),
            TextOrigin::Ocr => f.write_str("OCR"),
        }
    }
}

/// Non-empty, trimmed document text plus the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub origin: TextOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;

    #[test]
    fn bundle_json_shape() {
        let bundle = StudyBundle {
            summary: "s".into(),
            flashcards: vec![Flashcard {
                front: "Q".into(),
                back: "A".into(),
            }],
            mcqs: vec![Mcq {
                question: "q?".into(),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                answer: "d".into(),
            }],
            short_notes: "n".into(),
            failures: vec![],
        };
        let v = serde_json::to_value(&bundle).unwrap();
        assert_eq!(v["flashcards"][0]["front"], "Q");
        assert_eq!(v["mcqs"][0]["options"].as_array().unwrap().len(), 4);
        assert_eq!(v["short_notes"], "n");
        assert!(v.get("failures").is_none(), "empty failures are omitted");
    }

    #[test]
    fn failures_are_reported_per_field() {
        let bundle = StudyBundle {
            failures: vec![FieldFailure {
                field: StudyField::Flashcards,
                error: GenerationError::Timeout { secs: 1 },
            }],
            ..Default::default()
        };
        assert!(!bundle.is_complete());
        assert!(bundle.has_failed(StudyField::Flashcards));
        assert!(!bundle.has_failed(StudyField::Summary));
        let v = serde_json::to_value(&bundle).unwrap();
        assert_eq!(v["failures"][0]["field"], "flashcards");
    }

    #[test]
    fn field_display_matches_json_keys() {
        assert_eq!(StudyField::ShortNotes.to_string(), "short_notes");
        assert_eq!(StudyField::Mcqs.to_string(), "mcqs");
    }
}
