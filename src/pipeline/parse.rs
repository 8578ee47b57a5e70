//! Structured-output parsers: free-form model text → flashcards and MCQs.
//!
//! The model's answer is treated as weakly structured text in which a blank
//! line is the only reliable block delimiter. Both parsers are permissive:
//! a block needs *at least* N non-empty lines and anything past line N is
//! ignored, so small formatting drift does not zero out the batch. Blocks
//! that cannot supply every field are dropped; a partial record is never
//! produced and an empty list is a valid result.
//!
//! Both parsers are pure functions of their input.

use crate::config::McqAnswerSelection;
use crate::output::{Flashcard, Mcq};
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines needed for a flashcard block: front, back.
const FLASHCARD_MIN_LINES: usize = 2;
/// Lines needed for an MCQ block: question plus four options.
const MCQ_MIN_LINES: usize = 5;

/// A line holding only whitespace (Unicode-aware, same as `str::trim`) ends
/// a block.
static RE_BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[^\S\n]*\n\s*").unwrap());

/// Split text into blocks of trimmed, non-empty lines.
fn blocks(text: &str) -> impl Iterator<Item = Vec<&str>> {
    RE_BLOCK_SEPARATOR.split(text).map(|block| {
        block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    })
}

/// Parse flashcards: line 1 of each block is the front, line 2 the back.
pub fn parse_flashcards(text: &str) -> Vec<Flashcard> {
    blocks(text)
        .filter(|lines| lines.len() >= FLASHCARD_MIN_LINES)
        .map(|lines| Flashcard {
            front: lines[0].to_string(),
            back: lines[1].to_string(),
        })
        .collect()
}

/// Parse MCQs with the default [`LastOption`] answer rule.
pub fn parse_mcqs(text: &str) -> Vec<Mcq> {
    parse_mcqs_with(text, &LastOption)
}

/// Parse MCQs: line 1 is the question, lines 2–5 the options in order, and
/// `rule` picks the answer from the options and any trailing lines.
pub fn parse_mcqs_with(text: &str, rule: &dyn AnswerRule) -> Vec<Mcq> {
    blocks(text)
        .filter(|lines| lines.len() >= MCQ_MIN_LINES)
        .map(|lines| {
            let options: [String; 4] = [
                lines[1].to_string(),
                lines[2].to_string(),
                lines[3].to_string(),
                lines[4].to_string(),
            ];
            let idx = rule.answer_index(&options, &lines[MCQ_MIN_LINES..]).min(3);
            let answer = options[idx].clone();
            Mcq {
                question: lines[0].to_string(),
                options,
                answer,
            }
        })
        .collect()
}

// ── Answer rules ─────────────────────────────────────────────────────────────

/// Decides which of the four options of an MCQ block is correct.
///
/// Returning an index (not a string) keeps `answer ∈ options` true for every
/// rule.
pub trait AnswerRule: Send + Sync {
    /// `trailing` holds the block's non-empty lines after the fourth option.
    fn answer_index(&self, options: &[String; 4], trailing: &[&str]) -> usize;
}

/// The last option is the answer. Relies on the prompt asking the model to
/// place the correct choice last.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastOption;

impl AnswerRule for LastOption {
    fn answer_index(&self, _options: &[String; 4], _trailing: &[&str]) -> usize {
        3
    }
}

/// Reads an explicit `Answer: X` line after the options, where X is an
/// option letter (A–D) or the option's text. Falls back to the last option.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkedAnswer;

static RE_ANSWER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\**\s*(?:correct\s+)?answer\s*\**\s*[:\-]\s*\**\s*(.+?)\s*\**$").unwrap()
});
static RE_OPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\(?([a-d])\s*[\.\)]\s*").unwrap());

impl AnswerRule for MarkedAnswer {
    fn answer_index(&self, options: &[String; 4], trailing: &[&str]) -> usize {
        trailing
            .iter()
            .find_map(|line| RE_ANSWER_LINE.captures(line))
            .and_then(|caps| match_option(options, &caps[1]))
            .unwrap_or(3)
    }
}

fn match_option(options: &[String; 4], marked: &str) -> Option<usize> {
    let marked = marked.trim();
    if let Some(caps) = RE_OPTION_LABEL.captures(marked) {
        let letter = caps[1].to_ascii_lowercase();
        return letter
            .bytes()
            .next()
            .map(|b| usize::from(b - b'a'));
    }
    if marked.len() == 1 {
        let b = marked.as_bytes()[0].to_ascii_lowercase();
        if (b'a'..=b'd').contains(&b) {
            return Some(usize::from(b - b'a'));
        }
    }
    options.iter().position(|opt| {
        let body = RE_OPTION_LABEL.replace(opt, "");
        body.eq_ignore_ascii_case(marked) || opt.eq_ignore_ascii_case(marked)
    })
}

impl McqAnswerSelection {
    /// The rule implementing this selection.
    pub fn rule(self) -> &'static dyn AnswerRule {
        match self {
            McqAnswerSelection::LastOption => &LastOption,
            McqAnswerSelection::Marked => &MarkedAnswer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flashcards_two_blocks() {
        let cards = parse_flashcards("Q1\nA1\n\nQ2\nA2");
        assert_eq!(
            cards,
            vec![
                Flashcard {
                    front: "Q1".into(),
                    back: "A1".into()
                },
                Flashcard {
                    front: "Q2".into(),
                    back: "A2".into()
                },
            ]
        );
    }

    #[test]
    fn flashcard_single_line_block_dropped() {
        let cards = parse_flashcards("Here are your flashcards:\n\nQ1\nA1");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].front, "Q1");
    }

    #[test]
    fn flashcard_extra_lines_ignored_and_trimmed() {
        let cards = parse_flashcards("  Q1  \n  A1 \nnote\n\n\n\nQ2\nA2");
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].back, "A1");
        assert_eq!(cards[1].front, "Q2");
    }

    #[test]
    fn whitespace_only_separator_lines_split_blocks() {
        let cards = parse_flashcards("Q1\nA1\n   \nQ2\nA2");
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn unicode_space_separator_lines_split_blocks() {
        let cards = parse_flashcards("Q1\nA1\n\u{a0}\nQ2\nA2");
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].front, "Q2");

        let mcqs = parse_mcqs("Q1?\na\nb\nc\nd\n\u{3000}\t\nQ2?\ne\nf\ng\nh");
        assert_eq!(mcqs.len(), 2);
        assert_eq!(mcqs[1].answer, "h");
    }

    #[test]
    fn flashcards_empty_input() {
        assert!(parse_flashcards("").is_empty());
        assert!(parse_flashcards("\n\n\n").is_empty());
    }

    #[test]
    fn mcq_last_option_is_answer() {
        let mcqs = parse_mcqs("What is 2+2?\nA. 3\nB. 4\nC. 5\nD. 6");
        assert_eq!(mcqs.len(), 1);
        let m = &mcqs[0];
        assert_eq!(m.question, "What is 2+2?");
        assert_eq!(m.options, ["A. 3", "B. 4", "C. 5", "D. 6"].map(String::from));
        assert_eq!(m.answer, "D. 6");
    }

    #[test]
    fn mcq_short_block_dropped() {
        let text = "Q?\nA. 1\nB. 2\nC. 3\n\nWhat is 2+2?\nA. 3\nB. 4\nC. 5\nD. 4";
        let mcqs = parse_mcqs(text);
        assert_eq!(mcqs.len(), 1);
        assert_eq!(mcqs[0].question, "What is 2+2?");
    }

    #[test]
    fn mcq_trailing_lines_ignored_by_default_rule() {
        let mcqs = parse_mcqs("Q?\nA. x\nB. y\nC. z\nD. w\nAnswer: B");
        assert_eq!(mcqs[0].answer, "D. w");
    }

    #[test]
    fn marked_rule_reads_letter() {
        let mcqs = parse_mcqs_with("Q?\nA. x\nB. y\nC. z\nD. w\nAnswer: B", &MarkedAnswer);
        assert_eq!(mcqs[0].answer, "B. y");
    }

    #[test]
    fn marked_rule_reads_bold_label_and_text() {
        let mcqs = parse_mcqs_with(
            "Q?\nA) x\nB) y\nC) z\nD) w\n**Correct answer:** C) z",
            &MarkedAnswer,
        );
        assert_eq!(mcqs[0].answer, "C) z");

        let mcqs = parse_mcqs_with("Q?\nA. red\nB. blue\nC. green\nD. grey\nAnswer: blue", &MarkedAnswer);
        assert_eq!(mcqs[0].answer, "B. blue");
    }

    #[test]
    fn marked_rule_falls_back_to_last() {
        let mcqs = parse_mcqs_with("Q?\nA. x\nB. y\nC. z\nD. w", &MarkedAnswer);
        assert_eq!(mcqs[0].answer, "D. w");
        let mcqs = parse_mcqs_with("Q?\nA. x\nB. y\nC. z\nD. w\nAnswer: none of these", &MarkedAnswer);
        assert_eq!(mcqs[0].answer, "D. w");
    }

    #[test]
    fn answer_always_among_options() {
        let text = "Q1?\na\nb\nc\nd\nAnswer: A\n\nQ2?\na\nb\nc\nd\n\nnoise";
        for sel in [McqAnswerSelection::LastOption, McqAnswerSelection::Marked] {
            for m in parse_mcqs_with(text, sel.rule()) {
                assert!(m.options.contains(&m.answer));
            }
        }
    }

    #[test]
    fn parsing_is_deterministic() {
        let text = "Q1\nA1\n\nlone\n\nQ2\nA2\nextra";
        assert_eq!(parse_flashcards(text), parse_flashcards(text));
        let mcq_text = "Q?\nA. 1\nB. 2\nC. 3\nD. 4\n\nQ?\nA. 5\nB. 6\nC. 7\nD. 8";
        assert_eq!(parse_mcqs(mcq_text), parse_mcqs(mcq_text));
    }
}
