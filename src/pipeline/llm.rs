//! Provider-backed extraction: [`LlmBackend`] turns an
//! [`ExtractionRequest`] into an `edgequake-llm` chat call.
//!
//! ## Message layout
//!
//! 1. **System message**: the stage instruction, plus the JSON Schema block
//!    for structured stages
//! 2. **User message**: the text parts joined by blank lines, with every
//!    document part rasterised and attached as page images
//!
//! ## Retry strategy
//!
//! Every failed call (provider error or timeout) is retried up to
//! `max_retries` times with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): 500 ms → 1 s → 2 s by default.
//! Retries and timeouts live here only; the classifier sees one call.

use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::extract::{ContentPart, ExtractionBackend, ExtractionRequest, RawResponse, ResponseFormat};
use crate::output::TokenUsage;
use crate::pipeline::encode::encode_pages;
use crate::pipeline::render::{render_document, RenderOptions};
use crate::prompts::json_schema_block;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Call policy, copied out of the classifier config.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub temperature: f32,
    pub max_tokens: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub api_timeout_secs: u64,
}

impl From<&ClassifierConfig> for CallPolicy {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }
}

impl CallPolicy {
    /// Delay before retry number `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(2u64.saturating_pow(attempt - 1)))
    }
}

/// [`ExtractionBackend`] over an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
    label: String,
    policy: CallPolicy,
    render: RenderOptions,
}

impl LlmBackend {
    /// `label` names the provider/model in logs.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ClassifierConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            policy: CallPolicy::from(config),
            render: RenderOptions {
                dpi: config.dpi,
                max_rendered_pixels: config.max_rendered_pixels,
                max_pages: config.max_pages,
                password: config.password.clone(),
            },
        }
    }

    async fn build_messages(&self, request: &ExtractionRequest) -> Result<Vec<ChatMessage>, ClassifyError> {
        let mut system = request.instruction.clone();
        if let ResponseFormat::Json { schema, .. } = &request.format {
            let schema = serde_json::to_string_pretty(schema)
                .map_err(|e| ClassifyError::Internal(format!("schema serialisation failed: {e}")))?;
            system.push_str(&json_schema_block(&schema));
        }

        let mut texts: Vec<&str> = Vec::new();
        let mut images: Vec<ImageData> = Vec::new();
        for part in &request.parts {
            match part {
                ContentPart::Text(text) => texts.push(text),
                ContentPart::Document { name, bytes } => {
                    let pages = render_document(name, Arc::clone(bytes), &self.render).await?;
                    images.extend(encode_pages(name, &pages)?);
                }
            }
        }

        Ok(vec![
            ChatMessage::system(system),
            ChatMessage::user_with_images(texts.join("\n\n"), images),
        ])
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.policy.temperature),
            max_tokens: Some(self.policy.max_tokens),
            ..Default::default()
        }
    }
}

/// Why the last attempt failed.
enum Failure {
    Api(String),
    Timeout,
}

#[async_trait]
impl ExtractionBackend for LlmBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: ExtractionRequest) -> Result<RawResponse, ClassifyError> {
        let stage = request.stage;
        let messages = self.build_messages(&request).await?;
        let options = self.options();
        let limit = Duration::from_secs(self.policy.api_timeout_secs);
        let start = Instant::now();

        let mut last = Failure::Api("no attempt made".into());

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let backoff = self.policy.backoff(attempt);
                warn!(
                    "{} stage: retry {}/{} after {:?}",
                    stage, attempt, self.policy.max_retries, backoff
                );
                sleep(backoff).await;
            }

            match timeout(limit, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{} stage via {}: {} input tokens, {} output tokens, {:?}",
                        stage,
                        self.label,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(RawResponse {
                        content: response.content,
                        usage: TokenUsage::new(
                            response.prompt_tokens as u64,
                            response.completion_tokens as u64,
                        ),
                    });
                }
                Ok(Err(e)) => {
                    warn!("{} stage: attempt {} failed: {}", stage, attempt + 1, e);
                    last = Failure::Api(e.to_string());
                }
                Err(_) => {
                    warn!(
                        "{} stage: attempt {} timed out after {}s",
                        stage,
                        attempt + 1,
                        self.policy.api_timeout_secs
                    );
                    last = Failure::Timeout;
                }
            }
        }

        Err(match last {
            Failure::Timeout => ClassifyError::ApiTimeout {
                stage,
                secs: self.policy.api_timeout_secs,
            },
            Failure::Api(message) => ClassifyError::LlmApiError {
                stage,
                attempts: self.policy.max_retries + 1,
                message,
            },
        })
    }
}
