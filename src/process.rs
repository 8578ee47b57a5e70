//! Document processing entry points.
//!
//! [`StudyPipeline`] is the whole request: stage the upload, extract text
//! (text layer, then OCR), then make the four generation calls in order and
//! assemble a [`StudyBundle`]. It is generic over its two text sources and
//! its generator, so tests run it end to end against stubs.
//!
//! The free functions ([`process`], [`process_file`], [`process_to_file`],
//! [`process_sync`], [`extract_text`]) build the production pipeline from a
//! [`StudyConfig`].
//!
//! ## Failure policy
//!
//! Only input errors and a total extraction failure abort a request. Once
//! text exists, every field is attempted: a failed call leaves its field
//! error-marked (text fields) or empty (list fields) and is recorded in
//! [`StudyBundle::failures`], and the remaining calls still run.

use crate::config::StudyConfig;
use crate::error::{FieldFailure, GenerationError, StudyError};
use crate::output::{ExtractedText, StudyBundle, StudyField};
use crate::pipeline::extract::{NativeExtractor, TextExtractor, TextSource};
use crate::pipeline::input::{self, StagedUpload};
use crate::pipeline::llm::{generate_with_retry, Generator, LlmGenerator};
use crate::pipeline::ocr::ScannedExtractor;
use crate::pipeline::{parse, postprocess};
use crate::progress::StudyProgressCallback;
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The production pipeline: pdfium text layer, tesseract OCR, edgequake-llm.
pub type DefaultPipeline = StudyPipeline<NativeExtractor, ScannedExtractor, LlmGenerator>;

/// Upload → text → study bundle.
pub struct StudyPipeline<N, S, G> {
    extractor: TextExtractor<N, S>,
    generator: G,
    config: StudyConfig,
}

impl<N, S, G> StudyPipeline<N, S, G>
where
    N: TextSource,
    S: TextSource,
    G: Generator,
{
    pub fn new(native: N, scanned: S, generator: G, config: StudyConfig) -> Self {
        Self {
            extractor: TextExtractor::new(native, scanned),
            generator,
            config,
        }
    }

    /// Process one uploaded document.
    ///
    /// # Errors
    /// Input errors when the upload is rejected, and
    /// [`StudyError::ExtractionFailed`] when neither tier produced text. In
    /// both cases no generation call is made.
    pub async fn process(&self, bytes: &[u8], filename: &str) -> Result<StudyBundle, StudyError> {
        let total_start = Instant::now();
        info!("Processing upload: {}", filename);

        let staged = input::stage_upload(bytes, filename).await?;
        let extracted = extract_staged(&self.extractor, &staged, &self.config).await?;
        let bundle = self.generate_bundle(&extracted.text).await;

        info!(
            "Processed '{}' in {}ms ({} failed fields)",
            staged.filename(),
            total_start.elapsed().as_millis(),
            bundle.failures.len()
        );
        Ok(bundle)
    }

    /// Extract text only, without any generation.
    pub async fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedText, StudyError> {
        let staged = input::stage_upload(bytes, filename).await?;
        extract_staged(&self.extractor, &staged, &self.config).await
    }

    /// Run the four generation calls over `text` and assemble the bundle.
    ///
    /// Calls are made sequentially: summary, flashcards, MCQs, short notes.
    /// Only short notes are retried.
    pub async fn generate_bundle(&self, text: &str) -> StudyBundle {
        let config = &self.config;
        let mut failures = Vec::new();

        let summary = match self
            .generate_field(StudyField::Summary, &prompts::summary_prompt(text))
            .await
        {
            Ok(response) => response,
            Err(error) => record_failure(&mut failures, StudyField::Summary, error),
        };

        let flashcards = match self
            .generate_field(
                StudyField::Flashcards,
                &prompts::flashcards_prompt(text, config.flashcard_count),
            )
            .await
        {
            Ok(response) => parse::parse_flashcards(&response),
            Err(error) => {
                record_failure(&mut failures, StudyField::Flashcards, error);
                Vec::new()
            }
        };
        if flashcards.is_empty() && !failed(&failures, StudyField::Flashcards) {
            warn!("Flashcard response contained no complete blocks");
        }

        let mcqs = match self
            .generate_field(StudyField::Mcqs, &prompts::mcqs_prompt(text, config.mcq_count))
            .await
        {
            Ok(response) => parse::parse_mcqs_with(&response, config.mcq_answer.rule()),
            Err(error) => {
                record_failure(&mut failures, StudyField::Mcqs, error);
                Vec::new()
            }
        };
        if mcqs.is_empty() && !failed(&failures, StudyField::Mcqs) {
            warn!("MCQ response contained no complete blocks");
        }

        let short_notes = match self
            .generate_field(StudyField::ShortNotes, &prompts::short_notes_prompt(text))
            .await
        {
            Ok(response) => response,
            Err(error) => record_failure(&mut failures, StudyField::ShortNotes, error),
        };

        self.notify(|cb| cb.on_bundle_complete(failures.len()));

        StudyBundle {
            summary,
            flashcards,
            mcqs,
            short_notes,
            failures,
        }
    }

    /// One generation call, with progress events and response cleanup.
    async fn generate_field(&self, field: StudyField, prompt: &str) -> Result<String, GenerationError> {
        self.notify(|cb| cb.on_field_start(field));
        let start = Instant::now();

        let result = match field {
            StudyField::ShortNotes => {
                generate_with_retry(&self.generator, prompt, self.config.notes_retry, |attempt, max| {
                    info!("{}: retry {}/{}", field, attempt, max);
                    self.notify(|cb| cb.on_retry(field, attempt, max));
                })
                .await
            }
            _ => self.generator.generate(prompt).await,
        };

        match &result {
            Ok(response) => {
                debug!(
                    "{}: {} chars in {}ms",
                    field,
                    response.len(),
                    start.elapsed().as_millis()
                );
                self.notify(|cb| cb.on_field_complete(field));
            }
            Err(e) => {
                warn!("{} generation failed: {}", field, e);
                self.notify(|cb| cb.on_field_error(field, &e.to_string()));
            }
        }

        result.map(|response| postprocess::clean_response(&response))
    }

    fn notify(&self, event: impl FnOnce(&dyn StudyProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            event(cb.as_ref());
        }
    }
}

impl DefaultPipeline {
    /// Build the production pipeline, resolving the LLM provider from config
    /// and environment.
    pub fn from_config(config: &StudyConfig) -> Result<Self, StudyError> {
        let provider = resolve_provider(config)?;
        Ok(Self::with_provider(provider, config))
    }

    /// Build the production pipeline around an already-resolved provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &StudyConfig) -> Self {
        Self::new(
            NativeExtractor::from_config(config),
            ScannedExtractor::from_config(config),
            LlmGenerator::new(provider, config),
            config.clone(),
        )
    }
}

/// Write a failure into `failures` and return the marker text for its field.
fn record_failure(failures: &mut Vec<FieldFailure>, field: StudyField, error: GenerationError) -> String {
    let failure = FieldFailure { field, error };
    let marker = failure.marker_text();
    failures.push(failure);
    marker
}

fn failed(failures: &[FieldFailure], field: StudyField) -> bool {
    failures.iter().any(|f| f.field == field)
}

async fn extract_staged<N: TextSource, S: TextSource>(
    extractor: &TextExtractor<N, S>,
    staged: &StagedUpload,
    config: &StudyConfig,
) -> Result<ExtractedText, StudyError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(staged.filename());
    }

    let start = Instant::now();
    let extracted = extractor
        .extract(staged.path())
        .await
        .ok_or_else(|| StudyError::ExtractionFailed {
            filename: staged.filename().to_string(),
        })?;

    info!(
        "Extracted {} chars via {} in {}ms",
        extracted.text.len(),
        extracted.origin,
        start.elapsed().as_millis()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(extracted.origin, extracted.text.len());
    }

    Ok(extracted)
}

// ── Public entry points ──────────────────────────────────────────────────

/// Turn an uploaded PDF into a [`StudyBundle`].
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(StudyError)` only for fatal errors:
/// - missing file name, wrong extension, empty or non-PDF body
/// - no LLM provider could be resolved
/// - neither the text layer nor OCR produced any text
///
/// The upload is validated first, then the provider is resolved, then text
/// is extracted. Without a usable provider, a valid PDF therefore fails with
/// [`StudyError::ProviderNotConfigured`] even if it holds no extractable
/// text; use [`extract_text`] to check extraction on its own.
///
/// Generation failures do not fail the request; see
/// [`StudyBundle::failures`].
pub async fn process(bytes: &[u8], filename: &str, config: &StudyConfig) -> Result<StudyBundle, StudyError> {
    input::validate_upload(bytes, filename)?;
    let pipeline = DefaultPipeline::from_config(config)?;
    pipeline.process(bytes, filename).await
}

/// Read a local PDF and [`process`] it.
pub async fn process_file(path: impl AsRef<Path>, config: &StudyConfig) -> Result<StudyBundle, StudyError> {
    let path = path.as_ref();
    let bytes = input::read_local(path).await?;
    process(&bytes, &file_name(path), config).await
}

/// Process a local PDF and write the bundle as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn process_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &StudyConfig,
) -> Result<StudyBundle, StudyError> {
    let bundle = process_file(path, config).await?;
    let out = output_path.as_ref();
    let write_err = |source: std::io::Error| StudyError::OutputWriteFailed {
        path: out.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(&bundle)
        .map_err(|e| StudyError::Internal(format!("Failed to serialise bundle: {e}")))?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = out.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, out).await.map_err(write_err)?;

    Ok(bundle)
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(bytes: &[u8], filename: &str, config: &StudyConfig) -> Result<StudyBundle, StudyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StudyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(bytes, filename, config))
}

/// Extract text from an uploaded PDF without generating anything.
///
/// Does not require an LLM provider or API key.
pub async fn extract_text(
    bytes: &[u8],
    filename: &str,
    config: &StudyConfig,
) -> Result<ExtractedText, StudyError> {
    let staged = input::stage_upload(bytes, filename).await?;
    let extractor = TextExtractor::new(
        NativeExtractor::from_config(config),
        ScannedExtractor::from_config(config),
    );
    extract_staged(&extractor, &staged, config).await
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Model used with Gemini when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Model used with any other named provider when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

fn default_model(provider_name: &str) -> &'static str {
    if provider_name.eq_ignore_ascii_case("gemini") {
        DEFAULT_GEMINI_MODEL
    } else {
        DEFAULT_MODEL
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StudyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the API key is
///    read from that provider's usual environment variable.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both set and non-empty.
/// 4. **Gemini** when `GEMINI_API_KEY` is set, with `config.model` or
///    [`DEFAULT_GEMINI_MODEL`].
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &StudyConfig) -> Result<Arc<dyn LLMProvider>, StudyError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
