//! Text generation: one prompt in, one model response out.
//!
//! [`Generator`] is the seam between the pipeline and the model. The
//! production implementation, [`LlmGenerator`], wraps any edgequake-llm
//! provider; tests substitute scripted generators.
//!
//! ## Retry Strategy
//!
//! Only short notes are retried. [`generate_with_retry`] makes up to
//! `max_attempts` calls with a fixed pause between them (no pause after the
//! final failure): with the default 5 attempts and 2 s delay, a call that
//! never succeeds costs 8 s of waiting on top of the calls themselves.

use crate::config::{RetryPolicy, StudyConfig};
use crate::error::GenerationError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Something that turns a prompt into text.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// [`Generator`] backed by an edgequake-llm provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    system_prompt: Option<String>,
    timeout: Duration,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &StudyConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            system_prompt: config.system_prompt.clone(),
            timeout: config.api_timeout(),
        }
    }
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("provider", &"<dyn LLMProvider>")
            .field("system_prompt", &self.system_prompt.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Generator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_prompt.as_deref() {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| GenerationError::Timeout {
            secs: self.timeout.as_secs(),
        })?
        .map_err(|e| GenerationError::Provider {
            message: e.to_string(),
        })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the study config.
fn build_options(config: &StudyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Call `generator` until it succeeds or `policy.max_attempts` calls have
/// failed.
///
/// `on_retry(attempt, max_attempts)` fires before every attempt after the
/// first, once the delay has elapsed.
pub async fn generate_with_retry<G, F>(
    generator: &G,
    prompt: &str,
    policy: RetryPolicy,
    mut on_retry: F,
) -> Result<String, GenerationError>
where
    G: Generator,
    F: FnMut(u32, u32),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            sleep(policy.delay()).await;
            on_retry(attempt, max_attempts);
        }

        match generator.generate(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                last_error = e.to_string();
            }
        }
    }

    Err(GenerationError::RetriesExhausted {
        attempts: max_attempts,
        last_error,
    })
}
