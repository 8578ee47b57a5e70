//! Prompts for the four generation calls.
//!
//! Centralised so wording changes live in one place and tests can check that
//! the MCQ prompt still asks for the layout the parser expects.
//!
//! The flashcard and MCQ prompts describe the block layout explicitly
//! (blank line between items, one item field per line) because
//! [`crate::pipeline::parse`] relies on blank lines as the only block
//! delimiter.

/// Prompt for a free-form summary.
pub fn summary_prompt(text: &str) -> String {
    format!("Summarize this:\n\n{text}")
}

/// Prompt for `count` question/answer flashcards.
pub fn flashcards_prompt(text: &str, count: usize) -> String {
    format!(
        "Create {count} flashcards (Q&A) from the text below.\n\
Write each flashcard as two lines: the question on the first line and the answer on the second.\n\
Separate flashcards with one blank line. Do not number them or add any other text.\n\n\
{text}"
    )
}

/// Prompt for `count` four-option MCQs.
///
/// Asks for the correct choice as the last option so the default
/// last-option answer rule holds, and for an `Answer:` line so the marked
/// rule can work too.
pub fn mcqs_prompt(text: &str, count: usize) -> String {
    format!(
        "Create {count} MCQs with 4 answer choices each from the following text. \
Clearly indicate the correct answer.\n\
Write each MCQ as: the question on one line, then the four choices on four lines \
labelled A. B. C. D., with the correct choice always placed last (as D.), \
then a line 'Answer: D'.\n\
Separate MCQs with one blank line.\n\n\
{text}"
    )
}

/// Prompt for concise short notes.
pub fn short_notes_prompt(text: &str) -> String {
    format!("Create concise short notes from:\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_text() {
        let text = "Photosynthesis converts light to chemical energy.";
        for p in [
            summary_prompt(text),
            flashcards_prompt(text, 5),
            mcqs_prompt(text, 10),
            short_notes_prompt(text),
        ] {
            assert!(p.ends_with(text), "prompt must end with the document text: {p}");
        }
    }

    #[test]
    fn counts_are_interpolated() {
        assert!(flashcards_prompt("x", 7).starts_with("Create 7 flashcards"));
        assert!(mcqs_prompt("x", 3).starts_with("Create 3 MCQs"));
    }

    #[test]
    fn mcq_prompt_requests_answer_last() {
        let p = mcqs_prompt("x", 1);
        assert!(p.contains("placed last"));
        assert!(p.contains("Answer:"));
    }
}
