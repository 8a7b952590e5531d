//! Result and accounting types returned by the classifier.

use crate::schema::Classification;
use serde::Serialize;
use std::ops::AddAssign;
use std::path::PathBuf;

/// Tokens consumed by one or more LLM calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
    }
}

/// Per-document accounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentStats {
    /// LLM calls actually made (checkpoint hits excluded).
    pub llm_calls: u32,
    /// Stages answered from a checkpoint.
    pub checkpoint_hits: u32,
    pub usage: TokenUsage,
    /// Wall-clock time spent on the document.
    pub duration_ms: u64,
}

/// Outcome of one document, tagged with its position in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// 0-based position in the input list.
    pub index: usize,
    pub path: PathBuf,
    pub classification: Classification,
    pub stats: DocumentStats,
}

impl DocumentReport {
    pub fn is_error(&self) -> bool {
        self.classification.is_error()
    }
}

/// Aggregated batch accounting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_llm_calls: u64,
    pub checkpoint_hits: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Every report of a batch, in input order, plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub reports: Vec<DocumentReport>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Assemble from reports (any order) and the batch wall-clock time.
    pub fn from_reports(mut reports: Vec<DocumentReport>, total_duration_ms: u64) -> Self {
        reports.sort_by_key(|r| r.index);

        let failed = reports.iter().filter(|r| r.is_error()).count();
        let stats = BatchStats {
            total_documents: reports.len(),
            succeeded: reports.len() - failed,
            failed,
            total_llm_calls: reports.iter().map(|r| r.stats.llm_calls as u64).sum(),
            checkpoint_hits: reports.iter().map(|r| r.stats.checkpoint_hits as u64).sum(),
            total_input_tokens: reports.iter().map(|r| r.stats.usage.input_tokens).sum(),
            total_output_tokens: reports.iter().map(|r| r.stats.usage.output_tokens).sum(),
            total_duration_ms,
        };

        Self { reports, stats }
    }

    /// Final results in input order.
    pub fn classifications(&self) -> Vec<&Classification> {
        self.reports.iter().map(|r| &r.classification).collect()
    }
}
