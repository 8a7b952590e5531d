//! Configuration for document classification.
//!
//! All behaviour is controlled through [`ClassifierConfig`], built via
//! [`ClassifierConfigBuilder`]. The config is cheap to clone and is shared
//! by every document task of a batch.

use crate::error::ClassifyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Configuration for a [`crate::Classifier`].
///
/// # Example
/// ```rust
/// use edgequake_docclass::ClassifierConfig;
///
/// let config = ClassifierConfig::builder()
///     .concurrency(8)
///     .model("gpt-4.1")
///     .checkpoint_dir("/var/tmp/docclass")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ClassifierConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini", "claude-sonnet-4-20250514".
    /// If None, [`DEFAULT_MODEL`] or `EDGEQUAKE_MODEL`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every stage. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 8192.
    ///
    /// The OCR stage transcribes the whole document in one call, so this
    /// bounds the longest document that can be classified.
    pub max_tokens: usize,

    /// Retries on a failed LLM call (transport error, timeout). Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled on each retry. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Rendering DPI for the pages attached to the OCR call. Range: 72–400. Default: 150.
    pub dpi: u32,

    /// Cap on either dimension of a rendered page, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Pages of a document sent to the OCR stage. Default: 20.
    ///
    /// Business documents are short; the cap protects against a stray
    /// hundred-page scan burning the token budget.
    pub max_pages: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Documents classified concurrently. Default: 4.
    pub concurrency: usize,

    /// Whether stage outputs are persisted and reused. Default: true.
    pub checkpoints: bool,

    /// Checkpoint directory. If None, `$TMPDIR/ag_classifier`.
    pub checkpoint_dir: Option<PathBuf>,

    /// Directory of `{prompt_name}.md` files replacing built-in instructions.
    pub prompts_dir: Option<PathBuf>,

    /// Optional progress events sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            dpi: 150,
            max_rendered_pixels: 2000,
            max_pages: 20,
            password: None,
            concurrency: 4,
            checkpoints: true,
            checkpoint_dir: None,
            prompts_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("dpi", &self.dpi)
            .field("max_pages", &self.max_pages)
            .field("concurrency", &self.concurrency)
            .field("checkpoints", &self.checkpoints)
            .field("checkpoint_dir", &self.checkpoint_dir)
            .field("prompts_dir", &self.prompts_dir)
            .finish()
    }
}

impl ClassifierConfig {
    pub fn builder() -> ClassifierConfigBuilder {
        ClassifierConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective checkpoint directory.
    pub fn resolved_checkpoint_dir(&self) -> PathBuf {
        self.checkpoint_dir
            .clone()
            .unwrap_or_else(crate::checkpoint::FsCheckpointStore::default_dir)
    }
}

/// Builder for [`ClassifierConfig`].
#[derive(Debug)]
pub struct ClassifierConfigBuilder {
    config: ClassifierConfig,
}

impl ClassifierConfigBuilder {
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

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn checkpoints(mut self, enabled: bool) -> Self {
        self.config.checkpoints = enabled;
        self
    }

    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_dir = Some(dir.into());
        self
    }

    pub fn prompts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prompts_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClassifierConfig, ClassifyError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ClassifyError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(ClassifyError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ClassifyError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ClassifyError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_rendered_pixels < 100 {
            return Err(ClassifyError::InvalidConfig(format!(
                "max_rendered_pixels must be ≥ 100, got {}",
                c.max_rendered_pixels
            )));
        }
        Ok(self.config)
    }
}
