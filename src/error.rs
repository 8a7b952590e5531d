//! Error types for the edgequake-docclass library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ClassifyError`]: **Fatal for one document**: a stage could not
//!   produce a valid record (unreadable file, provider unreachable, reply
//!   does not match the requested schema). The orchestrator never lets it
//!   escape a document pipeline; it is converted into an
//!   [`crate::schema::ErrorOutput`] at the document boundary. Only
//!   [`crate::Classifier::from_config`] returns it directly, for global
//!   misconfiguration detected before a batch starts.
//!
//! * [`CheckpointError`]: **Never fatal**: a checkpoint could not be read
//!   or written. The pipeline logs it and carries on with the in-memory
//!   result (on save) or recomputes the stage (on load).

use crate::checkpoint::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the pipeline of a single document.
#[derive(Debug, Error)]
pub enum ClassifyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the document.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but contains no bytes.
    #[error("File is empty: '{path}'")]
    EmptyDocument { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API kept failing after all retries.
    #[error("LLM API error during {stage} stage after {attempts} attempt(s): {message}")]
    LlmApiError {
        stage: Stage,
        attempts: u32,
        message: String,
    },

    /// The LLM call timed out on every attempt.
    #[error("LLM call for {stage} stage timed out after {secs}s")]
    ApiTimeout { stage: Stage, secs: u64 },

    /// The model answered with no usable content.
    #[error("LLM returned empty content during {stage} stage")]
    EmptyResponse { stage: Stage },

    /// The model's reply did not conform to the requested schema.
    #[error("Failed to validate LLM response for {schema}: {detail}")]
    SchemaValidation { schema: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the aggregated results file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassifyError {
    /// `true` for failures of the document itself rather than of a stage.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::FileNotFound { .. }
                | ClassifyError::PermissionDenied { .. }
                | ClassifyError::ReadFailed { .. }
                | ClassifyError::EmptyDocument { .. }
                | ClassifyError::NotAPdf { .. }
        )
    }
}

/// A non-fatal checkpoint failure.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Reading or writing the checkpoint medium failed.
    #[error("Checkpoint I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored payload exists but cannot be used for its stage.
    #[error("Checkpoint for {stage} stage is unusable: {detail}")]
    Corrupt { stage: Stage, detail: String },

    /// The background I/O task failed to complete.
    #[error("Checkpoint task failed: {0}")]
    Task(String),
}
