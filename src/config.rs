//! Configuration types for document processing.
//!
//! All behaviour is controlled through [`StudyConfig`], built via its
//! [`StudyConfigBuilder`]. The config object is created once at process
//! startup and handed to the extractors and the generation client; nothing
//! in the library reads process-wide constants.

use crate::error::StudyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for turning one PDF into a study bundle.
///
/// # Example
/// ```rust
/// use pdf2study::StudyConfig;
///
/// let config = StudyConfig::builder()
///     .dpi(300)
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    /// Rendering DPI for scanned pages sent to OCR. Range: 72–600. Default: 400.
    ///
    /// Tesseract is tuned for glyphs around 20–30 px tall; 400 DPI gets body
    /// text there on typical scans at the cost of roughly 15 MP per A4 page.
    pub dpi: u32,

    /// Maximum rendered image dimension in pixels. Default: 8000.
    ///
    /// Caps oversized pages (posters, plans) so a 400-DPI render never
    /// allocates an unbounded bitmap.
    pub max_rendered_pixels: u32,

    /// OCR engine settings.
    pub ocr: OcrConfig,

    /// Directory containing the pdfium shared library.
    /// If None, the working directory and then the system library are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.4.
    pub temperature: f32,

    /// Maximum tokens per generation call. Default: 4096.
    pub max_tokens: usize,

    /// Optional system prompt sent ahead of every generation prompt.
    pub system_prompt: Option<String>,

    /// Retry policy for the short-notes call. Default: 5 attempts, 2 s apart.
    pub notes_retry: RetryPolicy,

    /// Per-generation-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Timeout in seconds for the text-layer read, and for each page while
    /// rendering for OCR. Default: 300.
    pub render_timeout_secs: u64,

    /// Number of flashcards requested from the model. Default: 5.
    pub flashcard_count: usize,

    /// Number of MCQs requested from the model. Default: 10.
    pub mcq_count: usize,

    /// How the correct MCQ option is identified. Default: last option.
    pub mcq_answer: McqAnswerSelection,

    /// Progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            dpi: 400,
            max_rendered_pixels: 8000,
            ocr: OcrConfig::default(),
            pdfium_lib_path: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 4096,
            system_prompt: None,
            notes_retry: RetryPolicy::default(),
            api_timeout_secs: 120,
            render_timeout_secs: 300,
            flashcard_count: 5,
            mcq_count: 10,
            mcq_answer: McqAnswerSelection::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr", &self.ocr)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("notes_retry", &self.notes_retry)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("flashcard_count", &self.flashcard_count)
            .field("mcq_count", &self.mcq_count)
            .field("mcq_answer", &self.mcq_answer)
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

/// Builder for [`StudyConfig`].
#[derive(Debug)]
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl StudyConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr(mut self, ocr: OcrConfig) -> Self {
        self.config.ocr = ocr;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<PathBuf>) -> Self {
        self.config.ocr.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr.timeout_secs = secs;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn notes_retry(mut self, policy: RetryPolicy) -> Self {
        self.config.notes_retry = policy;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn flashcard_count(mut self, n: usize) -> Self {
        self.config.flashcard_count = n;
        self
    }

    pub fn mcq_count(mut self, n: usize) -> Self {
        self.config.mcq_count = n;
        self
    }

    pub fn mcq_answer(mut self, selection: McqAnswerSelection) -> Self {
        self.config.mcq_answer = selection;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, StudyError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(StudyError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.notes_retry.max_attempts == 0 {
            return Err(StudyError::InvalidConfig(
                "Short-notes retry needs at least 1 attempt".into(),
            ));
        }
        if c.ocr.language.trim().is_empty() {
            return Err(StudyError::InvalidConfig("OCR language must not be empty".into()));
        }
        if c.api_timeout_secs == 0 || c.ocr.timeout_secs == 0 || c.render_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig("Timeouts must be ≥ 1s".into()));
        }
        if c.flashcard_count == 0 || c.mcq_count == 0 {
            return Err(StudyError::InvalidConfig(
                "Flashcard and MCQ counts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Sub-configs ──────────────────────────────────────────────────────────

/// Settings for the tesseract OCR engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// tesseract executable. Default: "tesseract" (looked up on PATH).
    pub tesseract_cmd: PathBuf,
    /// Language model. Default: "eng".
    pub language: String,
    /// `--oem`: 3 = default engine (LSTM when available).
    pub engine_mode: u8,
    /// `--psm`: 3 = fully automatic page segmentation, no OSD.
    pub page_seg_mode: u8,
    /// Per-page timeout in seconds. Default: 120.
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            engine_mode: 3,
            page_seg_mode: 3,
            timeout_secs: 120,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Pause before each attempt after the first.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// How the correct option of an MCQ block is identified.
///
/// See [`crate::pipeline::parse::AnswerRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McqAnswerSelection {
    /// The fourth option line is the answer. (default)
    #[default]
    LastOption,
    /// An `Answer: …` line after the options names the answer; falls back to
    /// the last option when absent or unmatched.
    Marked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = StudyConfig::default();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.ocr.engine_mode, 3);
        assert_eq!(c.ocr.page_seg_mode, 3);
        assert_eq!(c.ocr.language, "eng");
        assert_eq!(c.notes_retry.max_attempts, 5);
        assert_eq!(c.notes_retry.delay(), Duration::from_secs(2));
        assert_eq!(c.mcq_answer, McqAnswerSelection::LastOption);
    }

    #[test]
    fn builder_clamps_dpi() {
        let c = StudyConfig::builder().dpi(2000).build().unwrap();
        assert_eq!(c.dpi, 600);
        let c = StudyConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = StudyConfig::builder()
            .notes_retry(RetryPolicy {
                max_attempts: 0,
                delay_ms: 0,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, StudyError::InvalidConfig(_)));
    }

    #[test]
    fn empty_language_rejected() {
        assert!(StudyConfig::builder().ocr_language(" ").build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let c = StudyConfig::default();
        let s = format!("{c:?}");
        assert!(s.contains("StudyConfig"));
        assert!(s.contains("provider: None"));
    }
}
