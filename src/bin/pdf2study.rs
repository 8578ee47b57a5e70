//! CLI binary for pdf2study.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `StudyConfig` and prints the bundle as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2study::{
    extract_text, process, McqAnswerSelection, ProgressCallback, RetryPolicy, StudyBundle,
    StudyConfig, StudyField, StudyProgressCallback, TextOrigin,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the current stage, plus one
/// log line per finished field.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Stop the spinner when the run ends without a bundle.
    fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

impl StudyProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, filename: &str) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(filename.to_string());
    }

    fn on_extraction_complete(&self, origin: TextOrigin, chars: usize) {
        self.bar.println(format!(
            "  {} Text extracted via {:<10}  {}",
            green("✓"),
            origin.to_string(),
            dim(&format!("{chars} chars")),
        ));
    }

    fn on_field_start(&self, field: StudyField) {
        self.bar.set_prefix("Generating");
        self.bar.set_message(field.to_string());
    }

    fn on_field_complete(&self, field: StudyField) {
        self.bar.println(format!("  {} {}", green("✓"), field));
    }

    fn on_field_error(&self, field: StudyField, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {}  {}", red("✗"), field, red(&msg)));
    }

    fn on_retry(&self, field: StudyField, attempt: u32, max_attempts: u32) {
        self.bar
            .set_message(format!("{field} (attempt {attempt}/{max_attempts})"));
    }

    fn on_bundle_complete(&self, failed_fields: usize) {
        self.bar.finish_and_clear();
        if failed_fields == 0 {
            eprintln!("{} {}", green("✔"), bold("Study bundle ready"));
        } else {
            eprintln!(
                "{} Study bundle ready  ({} fields failed)",
                cyan("⚠"),
                red(&failed_fields.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Study bundle as JSON on stdout
  pdf2study lecture.pdf

  # Write the bundle to a file
  pdf2study lecture.pdf -o lecture.json

  # Only extract the text (no API key needed)
  pdf2study --extract-only scanned-handout.pdf

  # Use a specific model
  pdf2study --provider openai --model gpt-4.1-mini lecture.pdf

  # Scanned German notes, with a custom tesseract build
  pdf2study --ocr-lang deu --tesseract /opt/tesseract/bin/tesseract notes.pdf

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium

SETUP:
  1. Install tesseract:  apt install tesseract-ocr   (scanned PDFs only)
  2. Provide libpdfium:  next to the binary, system-wide, or PDFIUM_LIB_PATH
  3. Set API key:        export GEMINI_API_KEY=...
  4. Run:                pdf2study lecture.pdf -o lecture.json
"#;

/// Generate summaries, flashcards, MCQs and short notes from a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2study",
    version,
    about = "Generate study material (summary, flashcards, MCQs, short notes) from a PDF",
    long_about = "Extract the text of a PDF (embedded text layer, or OCR for scanned pages) and \
turn it into a summary, flashcards, multiple-choice questions and short notes using an LLM. \
Supports Google Gemini, OpenAI, Anthropic, and any provider edgequake-llm can reach.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write the JSON bundle to this file instead of stdout.
    #[arg(short, long, env = "PDF2STUDY_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the extracted text only, no generation.
    #[arg(long)]
    extract_only: bool,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set \
          (GEMINI_API_KEY is preferred)."
    )]
    provider: Option<String>,

    /// OCR rendering DPI (72–600).
    #[arg(long, env = "PDF2STUDY_DPI", default_value_t = 400,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// tesseract executable.
    #[arg(long, env = "PDF2STUDY_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// tesseract language(s), e.g. eng or eng+deu.
    #[arg(long, env = "PDF2STUDY_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Total attempts for the short-notes call.
    #[arg(long, env = "PDF2STUDY_NOTES_ATTEMPTS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    notes_attempts: u32,

    /// Delay between short-notes attempts, in milliseconds.
    #[arg(long, env = "PDF2STUDY_NOTES_DELAY_MS", default_value_t = 2000)]
    notes_delay_ms: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF2STUDY_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Per-page tesseract timeout in seconds.
    #[arg(long, env = "PDF2STUDY_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Directory containing libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// How the correct MCQ option is identified.
    #[arg(long, env = "PDF2STUDY_ANSWER_RULE", value_enum, default_value = "last")]
    answer_rule: AnswerRuleArg,

    /// Disable progress spinner.
    #[arg(long, env = "PDF2STUDY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2STUDY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2STUDY_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AnswerRuleArg {
    /// The fourth option is the answer.
    Last,
    /// Read an `Answer:` line, else the fourth option.
    Marked,
}

impl From<AnswerRuleArg> for McqAnswerSelection {
    fn from(v: AnswerRuleArg) -> Self {
        match v {
            AnswerRuleArg::Last => McqAnswerSelection::LastOption,
            AnswerRuleArg::Marked => McqAnswerSelection::Marked,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb = spinner
        .clone()
        .map(|cb| cb as Arc<dyn StudyProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    let result = run(&cli, &config).await;
    if result.is_err() {
        if let Some(ref spinner) = spinner {
            spinner.abandon();
        }
    }
    result
}

async fn run(cli: &Cli, config: &StudyConfig) -> Result<()> {
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let extracted = extract_text(&bytes, &filename, config)
            .await
            .context("Text extraction failed")?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_bundle_complete(0);
        }
        write_output(cli.output.as_deref(), &extracted.text)?;
        if !cli.quiet {
            eprintln!(
                "{} chars via {}",
                extracted.text.len(),
                bold(&extracted.origin.to_string())
            );
        }
        return Ok(());
    }

    // ── Full run ─────────────────────────────────────────────────────────
    let bundle = process(&bytes, &filename, config)
        .await
        .context("Processing failed")?;

    let json = serde_json::to_string_pretty(&bundle).context("Failed to serialise bundle")?;
    write_output(cli.output.as_deref(), &json)?;

    if !cli.quiet {
        print_summary(&bundle, cli.output.as_deref());
    }

    Ok(())
}

/// Map CLI args to `StudyConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudyConfig> {
    let mut builder = StudyConfig::builder()
        .dpi(cli.dpi)
        .tesseract_cmd(cli.tesseract.clone())
        .ocr_language(cli.ocr_lang.clone())
        .ocr_timeout_secs(cli.ocr_timeout)
        .notes_retry(RetryPolicy {
            max_attempts: cli.notes_attempts,
            delay_ms: cli.notes_delay_ms,
        })
        .api_timeout_secs(cli.api_timeout)
        .mcq_answer(cli.answer_rule.into());

    if let Some(ref dir) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(dir.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write `content` to `path` (atomically) or to stdout.
fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let tmp = path.with_extension("tmp");
            std::fs::write(&tmp, content)
                .and_then(|_| std::fs::rename(&tmp, path))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            if !content.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

fn print_summary(bundle: &StudyBundle, output: Option<&Path>) {
    eprintln!(
        "   {} flashcards  /  {} MCQs{}",
        bundle.flashcards.len(),
        bundle.mcqs.len(),
        output
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    for failure in &bundle.failures {
        eprintln!("   {} {}: {}", red("✗"), failure.field, dim(&failure.error.to_string()));
    }
}
