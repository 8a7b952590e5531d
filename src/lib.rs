//! # edgequake-docclass
//!
//! Classify scanned business documents (PDF) and extract their metadata
//! with Large Language Models.
//!
//! Each document goes through three model calls. Every stage result is
//! checkpointed under the document's content hash, so an interrupted batch
//! resumes where it stopped and a re-run over unchanged files makes no
//! calls at all.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. OCR         page images → Markdown transcription
//!  ├─ 2. Triage      Markdown → group, number, issue date (+ notes)
//!  ├─ 3. Specialist  triage record → document type + typed metadata
//!  │                 (skipped for OUTROS_DOCUMENTOS)
//!  └─ Output         one JSON record per document, or an error record
//! ```
//!
//! | Group | Specialist |
//! |-------|------------|
//! | `DOCUMENTOS_BANCARIOS` | [`BankingDocument`] |
//! | `DOCUMENTOS_ADUANEIROS` | [`CustomsDocument`] |
//! | `DOCUMENTOS_COMERCIAIS` | [`InvoiceDocument`] |
//! | `DOCUMENTOS_FISCAIS` | [`TaxesDocument`] |
//! | `DOCUMENTOS_FRETE` | [`FreightDocument`] |
//! | `DOCUMENTOS_RH` | [`HrDocument`] |
//! | `OUTROS_DOCUMENTOS` | none, the triage record is final |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docclass::{classify_batch, write_results, Classifier, ClassifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ClassifierConfig::builder().concurrency(4).build()?;
//!     let classifier = Classifier::from_config(config).await?;
//!
//!     let output = classify_batch(&classifier, ["invoice.pdf", "payslip.pdf"]).await;
//!     for report in &output.reports {
//!         println!("{}: {}", report.path.display(), report.classification.label());
//!     }
//!     write_results("results.json", &output.reports).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docclass` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Failure model
//!
//! A document never fails a batch. Unreadable files, provider outages and
//! invalid model replies all end as an [`ErrorOutput`] for that document;
//! only a missing provider configuration is fatal, and it is reported by
//! [`Classifier::from_config`] before any document is read.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod identifier;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{classify_batch, classify_stream, write_results, ReportStream};
pub use checkpoint::{CheckpointStore, DisabledCheckpointStore, FsCheckpointStore, Stage};
pub use classify::Classifier;
pub use config::{ClassifierConfig, ClassifierConfigBuilder, DEFAULT_MODEL};
pub use error::{CheckpointError, ClassifyError};
pub use extract::{ExtractionBackend, ExtractionRequest, RawResponse, StructuredClient};
pub use identifier::DocumentId;
pub use output::{BatchOutput, BatchStats, DocumentReport, DocumentStats, TokenUsage};
pub use progress::{ClassificationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::PromptSet;
pub use schema::{
    BankingDocument, Classification, CustomsDocument, DocumentGroup, ErrorOutput, FreightDocument,
    HrDocument, InvoiceDocument, SpecialistOutput, TaxesDocument, TriageOutput,
};
