//! Stage pipeline: drive one document from bytes to a final classification.
//!
//! ```text
//! read ─▶ id ─▶ [1] OCR ─▶ [2] triage ─┬─▶ no specialist ─▶ triage record
//!                │            │        └─▶ [3] specialist ─▶ specialist record
//!                ▼            ▼                  ▼
//!           checkpoint   checkpoint         checkpoint
//! ```
//!
//! Each stage first looks for a checkpoint of the same document (content
//! identifier) and stage. A usable checkpoint replaces the model call; a
//! missing or unusable one triggers the call, and the validated result is
//! checkpointed. Checkpoint problems never fail a document.
//!
//! Every failure ends the document with an [`ErrorOutput`] that carries
//! whatever triage had already established. Nothing escapes
//! [`Classifier::classify`] as an `Err`, so one bad document never disturbs
//! the rest of a batch.

use crate::checkpoint::{CheckpointStore, DisabledCheckpointStore, FsCheckpointStore, Stage};
use crate::config::{ClassifierConfig, DEFAULT_MODEL};
use crate::dispatch::{self, Specialist};
use crate::error::ClassifyError;
use crate::extract::{parse_reply, ContentPart, ExtractionBackend, StageRecord, StructuredClient};
use crate::identifier::DocumentId;
use crate::output::{DocumentReport, DocumentStats, TokenUsage};
use crate::pipeline::input::read_document;
use crate::pipeline::llm::LlmBackend;
use crate::prompts::{self, PromptSet};
use crate::schema::{
    BankingDocument, Classification, CustomsDocument, ErrorOutput, FreightDocument, HrDocument,
    InvoiceDocument, SpecialistDocument, SpecialistOutput, StageReply, TaxesDocument, TriageOutput,
};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Classifies documents. Cheap to clone; clones share backend and store.
#[derive(Clone)]
pub struct Classifier {
    client: StructuredClient,
    checkpoints: Arc<dyn CheckpointStore>,
    prompts: Arc<PromptSet>,
    config: ClassifierConfig,
}

impl Classifier {
    /// Build a classifier talking to the configured LLM provider.
    ///
    /// Fails only on global misconfiguration (no provider, unreadable
    /// prompts directory), before any document is touched.
    pub async fn from_config(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        let (provider, label) = resolve_provider(&config).await?;
        let backend = Arc::new(LlmBackend::new(provider, label, &config));

        let checkpoints: Arc<dyn CheckpointStore> = if config.checkpoints {
            let dir = config.resolved_checkpoint_dir();
            info!("Checkpoints in {}", dir.display());
            Arc::new(FsCheckpointStore::new(dir))
        } else {
            info!("Checkpoints disabled");
            Arc::new(DisabledCheckpointStore)
        };

        let prompts = match config.prompts_dir {
            Some(ref dir) => PromptSet::with_overrides(dir)?,
            None => PromptSet::default(),
        };

        Ok(Self::new(backend, checkpoints, config).with_prompts(prompts))
    }

    /// Build a classifier over an explicit backend and store.
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: ClassifierConfig,
    ) -> Self {
        let client = StructuredClient::new(backend);
        debug!("Classifier over backend {}", client.backend_name());
        Self {
            client,
            checkpoints,
            prompts: Arc::new(PromptSet::default()),
            config,
        }
    }

    /// Replace the stage instructions.
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify one document. Never fails: errors become an error record.
    pub async fn classify(&self, path: impl AsRef<Path>) -> Classification {
        self.classify_report(0, path).await.classification
    }

    /// Classify one document and account for it.
    ///
    /// `index` is the document's position in its batch, echoed in the
    /// report and in progress events.
    pub async fn classify_report(&self, index: usize, path: impl AsRef<Path>) -> DocumentReport {
        let path = path.as_ref();
        let start = Instant::now();
        let mut run = DocumentRun::new(self, index, path);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_document_start(index, &run.location);
        }
        info!("[{}] {}: classification started", index, run.location);

        let classification = match run.execute().await {
            Ok(classification) => classification,
            Err(e) => {
                warn!("[{}] {}: {}", index, run.location, e);
                run.error_output(&e)
            }
        };

        let mut stats = run.stats;
        stats.duration_ms = start.elapsed().as_millis() as u64;

        if let Some(ref cb) = self.config.progress_callback {
            match classification.as_error() {
                Some(err) => cb.on_document_error(index, &run.location, &err.erro),
                None => cb.on_document_complete(index, &run.location, &classification.label()),
            }
        }
        info!(
            "[{}] {}: {} ({} LLM call(s), {} checkpoint hit(s), {}ms)",
            index,
            run.location,
            classification.label(),
            stats.llm_calls,
            stats.checkpoint_hits,
            stats.duration_ms
        );

        DocumentReport {
            index,
            path: path.to_path_buf(),
            classification,
            stats,
        }
    }
}

// ── One document ─────────────────────────────────────────────────────────

struct DocumentRun<'a> {
    classifier: &'a Classifier,
    index: usize,
    path: &'a Path,
    location: String,
    stats: DocumentStats,
    /// Set once triage produced a record; attached to later errors.
    triage: Option<TriageOutput>,
}

impl<'a> DocumentRun<'a> {
    fn new(classifier: &'a Classifier, index: usize, path: &'a Path) -> Self {
        Self {
            classifier,
            index,
            path,
            location: path.display().to_string(),
            stats: DocumentStats::default(),
            triage: None,
        }
    }

    async fn execute(&mut self) -> Result<Classification, ClassifyError> {
        let bytes = Arc::new(read_document(self.path).await?);
        let id = DocumentId::from_bytes(&bytes);
        debug!("[{}] content id {}", self.index, id);

        let markdown = self.ocr(&id, &bytes).await?;

        let triage = match self.triage(&id, &markdown).await? {
            StageReply::Record(triage) => triage,
            StageReply::Rejected(err) => return Ok(Classification::Error(self.located(err))),
        };
        self.triage = Some(triage.clone());

        let Some(entry) = dispatch::lookup(triage.grupo_documento) else {
            info!(
                "[{}] {}: no specialist for {}, triage is final",
                self.index, self.location, triage.grupo_documento
            );
            return Ok(Classification::Triage(triage.without_content()));
        };
        let prompt = self.classifier.prompts.get(entry.prompt_name)?;

        Ok(match entry.specialist {
            Specialist::Banking => {
                let reply = self.specialist::<BankingDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Banking)
            }
            Specialist::Customs => {
                let reply = self.specialist::<CustomsDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Customs)
            }
            Specialist::Freight => {
                let reply = self.specialist::<FreightDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Freight)
            }
            Specialist::Hr => {
                let reply = self.specialist::<HrDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Hr)
            }
            Specialist::Invoice => {
                let reply = self.specialist::<InvoiceDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Invoice)
            }
            Specialist::Taxes => {
                let reply = self.specialist::<TaxesDocument>(&id, &triage, prompt).await?;
                self.conclude(reply, Classification::Taxes)
            }
        })
    }

    // ── Stage 1 ──────────────────────────────────────────────────────────

    async fn ocr(&mut self, id: &DocumentId, bytes: &Arc<Vec<u8>>) -> Result<String, ClassifyError> {
        if let Some(markdown) = self.load(id, Stage::Ocr).await {
            if !markdown.trim().is_empty() {
                self.hit(Stage::Ocr);
                return Ok(markdown);
            }
            warn!("[{}] OCR checkpoint is empty, recomputing", self.index);
        }

        let prompt = self.classifier.prompts.get(prompts::OCR_PROMPT_NAME)?;
        let parts = vec![
            ContentPart::Text(prompts::ocr_user_message(&self.location)),
            ContentPart::Document {
                name: self.location.clone(),
                bytes: Arc::clone(bytes),
            },
        ];
        let out = self.classifier.client.transcribe(prompt, parts).await?;
        self.computed(Stage::Ocr, out.usage);

        self.save(id, Stage::Ocr, &out.value).await;
        Ok(out.value)
    }

    // ── Stage 2 ──────────────────────────────────────────────────────────

    async fn triage(
        &mut self,
        id: &DocumentId,
        markdown: &str,
    ) -> Result<StageReply<TriageOutput>, ClassifyError> {
        if let Some(mut triage) = self.load_record::<TriageOutput>(id, Stage::Triage).await {
            self.hit(Stage::Triage);
            if triage.conteudo.trim().is_empty() {
                triage.conteudo = markdown.to_string();
            }
            triage.localizacao_ficheiro = self.location.clone();
            return Ok(StageReply::Record(triage));
        }

        let prompt = self.classifier.prompts.get(prompts::TRIAGE_PROMPT_NAME)?;
        let parts = vec![ContentPart::Text(prompts::triage_user_message(
            &self.location,
            markdown,
        ))];
        let out = self
            .classifier
            .client
            .invoke::<TriageOutput>(Stage::Triage, prompt, parts)
            .await?;
        self.computed(Stage::Triage, out.usage);

        match out.value {
            StageReply::Record(mut triage) => {
                if triage.conteudo.trim().is_empty() {
                    triage.conteudo = markdown.to_string();
                }
                triage.localizacao_ficheiro = self.location.clone();
                info!(
                    "[{}] {}: triage → {}",
                    self.index, self.location, triage.grupo_documento
                );
                self.save_record(id, Stage::Triage, &triage).await;
                Ok(StageReply::Record(triage))
            }
            rejected => Ok(rejected),
        }
    }

    // ── Stage 3 ──────────────────────────────────────────────────────────

    async fn specialist<D: SpecialistDocument>(
        &mut self,
        id: &DocumentId,
        triage: &TriageOutput,
        prompt: &str,
    ) -> Result<StageReply<SpecialistOutput<D>>, ClassifyError> {
        if let Some(mut record) = self
            .load_record::<SpecialistOutput<D>>(id, Stage::Specialist)
            .await
        {
            self.hit(Stage::Specialist);
            record.localizacao_ficheiro = self.location.clone();
            return Ok(StageReply::Record(record));
        }

        let triage_json = serde_json::to_string_pretty(triage)
            .map_err(|e| ClassifyError::Internal(format!("triage serialisation failed: {e}")))?;
        let parts = vec![ContentPart::Text(prompts::specialist_user_message(
            &triage_json,
        ))];
        let out = self
            .classifier
            .client
            .invoke::<SpecialistOutput<D>>(Stage::Specialist, prompt, parts)
            .await?;
        self.computed(Stage::Specialist, out.usage);

        match out.value {
            StageReply::Record(mut record) => {
                record.localizacao_ficheiro = self.location.clone();
                info!(
                    "[{}] {}: specialist → {}",
                    self.index,
                    self.location,
                    record.documento.tipo_documento()
                );
                self.save_record(id, Stage::Specialist, &record).await;
                Ok(StageReply::Record(record))
            }
            rejected => Ok(rejected),
        }
    }

    fn conclude<D: SpecialistDocument>(
        &self,
        reply: StageReply<SpecialistOutput<D>>,
        wrap: fn(SpecialistOutput<D>) -> Classification,
    ) -> Classification {
        match reply {
            StageReply::Record(record) => wrap(record),
            StageReply::Rejected(err) => Classification::Error(self.located(err)),
        }
    }

    // ── Checkpoints ──────────────────────────────────────────────────────

    /// Raw payload, `None` when absent or unreadable.
    async fn load(&self, id: &DocumentId, stage: Stage) -> Option<String> {
        match self.classifier.checkpoints.load(id, stage).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[{}] {}; recomputing", self.index, e);
                None
            }
        }
    }

    /// Validated record, `None` when absent or unusable.
    async fn load_record<T: StageRecord>(&self, id: &DocumentId, stage: Stage) -> Option<T> {
        let payload = self.load(id, stage).await?;
        match parse_reply::<T>(&payload) {
            Ok(StageReply::Record(record)) => Some(record),
            Ok(StageReply::Rejected(_)) => {
                warn!(
                    "[{}] {} checkpoint holds an error record; recomputing",
                    self.index, stage
                );
                None
            }
            Err(e) => {
                warn!("[{}] {} checkpoint is unusable ({}); recomputing", self.index, stage, e);
                None
            }
        }
    }

    async fn save(&self, id: &DocumentId, stage: Stage, payload: &str) {
        if let Err(e) = self.classifier.checkpoints.save(id, stage, payload).await {
            warn!("[{}] {}; continuing without checkpoint", self.index, e);
        }
    }

    async fn save_record<T: StageRecord>(&self, id: &DocumentId, stage: Stage, record: &T) {
        match serde_json::to_string_pretty(record) {
            Ok(payload) => self.save(id, stage, &payload).await,
            Err(e) => warn!("[{}] cannot serialise {} record: {}", self.index, stage, e),
        }
    }

    // ── Accounting ───────────────────────────────────────────────────────

    fn hit(&mut self, stage: Stage) {
        debug!("[{}] {} loaded from checkpoint", self.index, stage);
        self.stats.checkpoint_hits += 1;
        self.notify(stage, true);
    }

    fn computed(&mut self, stage: Stage, usage: TokenUsage) {
        self.stats.llm_calls += 1;
        self.stats.usage += usage;
        self.notify(stage, false);
    }

    fn notify(&self, stage: Stage, from_checkpoint: bool) {
        if let Some(ref cb) = self.classifier.config.progress_callback {
            cb.on_stage_complete(self.index, stage, from_checkpoint);
        }
    }

    // ── Errors ───────────────────────────────────────────────────────────

    /// Checkpoints are shared by identical copies, so the echoed path is
    /// always replaced with the input's own.
    fn located(&self, mut err: ErrorOutput) -> ErrorOutput {
        err.localizacao_ficheiro = self.location.clone();
        err
    }

    fn error_output(&self, e: &ClassifyError) -> Classification {
        let err = ErrorOutput::new(self.path, e.to_string());
        Classification::Error(match self.triage {
            Some(ref triage) => err.with_triage(triage),
            None => err,
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ClassifyError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        ClassifyError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, most specific first:
///
/// 1. `config.provider` as-is
/// 2. `config.provider_name` with `config.model` (or [`DEFAULT_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. `ProviderFactory::from_env` auto-detection
///
/// Returns the provider and a `provider/model` label for logs.
async fn resolve_provider(
    config: &ClassifierConfig,
) -> Result<(Arc<dyn LLMProvider>, String), ClassifyError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return Ok((create_provider(name, model)?, format!("{name}/{model}")));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            let provider = create_provider(&prov, &env_model)?;
            return Ok((provider, format!("{prov}/{env_model}")));
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|key| !key.is_empty()) {
        return Ok((create_provider("openai", model)?, format!("openai/{model}")));
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ClassifyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;

    Ok((provider, "auto".to_string()))
}
