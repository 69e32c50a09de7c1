//! Vision-model interaction: the model seam, the Gemini adapter, and the
//! bounded retry loop around a single analysis call.
//!
//! ## Retry Strategy
//!
//! Only rate-limit failures are retried: the provider error text must carry
//! one of [`crate::error::RATE_LIMIT_MARKERS`]. Attempt `i` (0-based) that
//! fails this way waits `backoff * 2^i` before the next one, so with the
//! default one-second unit and three retries the waits are 1 s → 2 s → 4 s.
//! Anything else (bad key, timeout, malformed request) stops immediately.

use crate::config::ModelId;
use crate::error::{ModelError, RadNoteError};
use crate::progress::{GenerationProgressCallback, GenerationStage};
use crate::prompts::WEB_CONTEXT_INSTRUCTION;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Prefix that marks a report as an error rather than a model answer.
pub const ERROR_REPORT_PREFIX: &str = "⚠️ Analysis error: ";

/// A multimodal model that answers a prompt about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `prompt` together with the encoded image and return the model's
    /// text.
    async fn analyze(&self, prompt: &str, image: &ImageData) -> Result<String, ModelError>;
}

/// [`VisionModel`] backed by a Gemini provider from `edgequake-llm`.
pub struct GeminiVisionModel {
    provider: Arc<dyn LLMProvider>,
    model: ModelId,
    web_enabled: bool,
}

impl GeminiVisionModel {
    /// Build a handle for `model`. The provider reads its key from
    /// `GEMINI_API_KEY`.
    pub fn new(model: ModelId, web_enabled: bool) -> Result<Self, RadNoteError> {
        let provider = ProviderFactory::create_llm_provider("gemini", model.as_str()).map_err(|e| {
            RadNoteError::ProviderNotConfigured {
                provider: "gemini".to_string(),
                hint: format!("{e}"),
            }
        })?;
        info!("Created Gemini handle: model={} web={}", model, web_enabled);
        Ok(Self::with_provider(provider, model, web_enabled))
    }

    /// Wrap an already-constructed provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, model: ModelId, web_enabled: bool) -> Self {
        Self {
            provider,
            model,
            web_enabled,
        }
    }

    fn build_messages(&self, prompt: &str, image: ImageData) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if self.web_enabled {
            messages.push(ChatMessage::system(WEB_CONTEXT_INSTRUCTION));
        }
        messages.push(ChatMessage::user_with_images(prompt, vec![image]));
        messages
    }
}

#[async_trait]
impl VisionModel for GeminiVisionModel {
    async fn analyze(&self, prompt: &str, image: &ImageData) -> Result<String, ModelError> {
        let messages = self.build_messages(prompt, image.clone());
        let options = CompletionOptions::default();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::new(format!("{}", e)))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.model, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Result of [`run_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Model text, or the last error seen.
    pub result: Result<String, ModelError>,
    /// Number of times the model was called.
    pub attempts: u32,
    /// Total time spent sleeping between attempts.
    pub total_backoff: Duration,
}

impl RetryOutcome {
    /// The text to show the user: the model answer, or an error report.
    pub fn into_report_text(self) -> String {
        match self.result {
            Ok(text) => text,
            Err(e) => error_report(&e),
        }
    }
}

/// Format a model failure as displayable report content.
pub fn error_report(err: &ModelError) -> String {
    format!("{ERROR_REPORT_PREFIX}{err}")
}

/// Backoff before the attempt following 0-based attempt `attempt_index`.
pub fn backoff_delay(unit: Duration, attempt_index: u32) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt_index))
}

/// Call `model` up to `max_retries + 1` times, retrying only rate limits.
///
/// Returns on the first success. Never panics or propagates: the outcome
/// carries either the text or the last error.
pub async fn run_with_retry(
    model: &dyn VisionModel,
    prompt: &str,
    image: &ImageData,
    max_retries: u32,
    backoff_unit: Duration,
    progress: Option<&dyn GenerationProgressCallback>,
) -> RetryOutcome {
    let start = Instant::now();
    let mut last_err: Option<ModelError> = None;
    let mut total_backoff = Duration::ZERO;
    let mut attempts = 0;

    for i in 0..=max_retries {
        attempts = i + 1;
        if let Some(cb) = progress {
            cb.on_stage(GenerationStage::Invoking { attempt: attempts });
        }

        match model.analyze(prompt, image).await {
            Ok(text) => {
                debug!("Model answered on attempt {} in {:?}", attempts, start.elapsed());
                return RetryOutcome {
                    result: Ok(text),
                    attempts,
                    total_backoff,
                };
            }
            Err(e) => {
                let will_retry = e.is_rate_limited() && i < max_retries;
                warn!("Attempt {} failed — {}", attempts, e);
                if let Some(cb) = progress {
                    cb.on_attempt_failed(attempts, &e.message, will_retry);
                }
                last_err = Some(e);

                if !will_retry {
                    break;
                }

                let delay = backoff_delay(backoff_unit, i);
                warn!("Rate limited: retry {}/{} after {:?}", i + 1, max_retries, delay);
                if let Some(cb) = progress {
                    cb.on_stage(GenerationStage::Retrying {
                        attempt: i + 1,
                        delay,
                    });
                }
                sleep(delay).await;
                total_backoff += delay;
            }
        }
    }

    RetryOutcome {
        result: Err(last_err.unwrap_or_else(|| ModelError::new("Unknown error"))),
        attempts,
        total_backoff,
    }
}
