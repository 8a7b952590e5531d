//! Batch fan-out: classify many documents concurrently.
//!
//! Each document runs in its own tokio task, at most
//! [`ClassifierConfig::concurrency`](crate::ClassifierConfig) at a time.
//! Documents share nothing but the backend and the checkpoint store, and a
//! document that fails (or whose task panics) produces an error record for
//! itself only.
//!
//! [`classify_batch`] collects everything and restores input order;
//! [`classify_stream`] yields reports as they complete.

use crate::classify::Classifier;
use crate::error::ClassifyError;
use crate::output::{BatchOutput, DocumentReport, DocumentStats};
use crate::schema::{Classification, ErrorOutput};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{error, info};

/// A boxed stream of per-document reports, in completion order.
pub type ReportStream = Pin<Box<dyn Stream<Item = DocumentReport> + Send>>;

/// Classify every path and return the reports in input order.
pub async fn classify_batch<P>(classifier: &Classifier, paths: impl IntoIterator<Item = P>) -> BatchOutput
where
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    let total = paths.len();
    let start = Instant::now();

    info!(
        "Classifying {} document(s), concurrency {}",
        total, classifier.config().concurrency
    );
    if let Some(ref cb) = classifier.config().progress_callback {
        cb.on_batch_start(total);
    }

    let reports: Vec<DocumentReport> = fan_out(classifier, paths).collect().await;
    let output = BatchOutput::from_reports(reports, start.elapsed().as_millis() as u64);

    if let Some(ref cb) = classifier.config().progress_callback {
        cb.on_batch_complete(total, output.stats.succeeded);
    }
    info!(
        "Batch done: {}/{} classified, {} LLM call(s), {} checkpoint hit(s), {}ms",
        output.stats.succeeded,
        output.stats.total_documents,
        output.stats.total_llm_calls,
        output.stats.checkpoint_hits,
        output.stats.total_duration_ms
    );
    output
}

/// Classify every path, yielding each report as soon as it is ready.
///
/// Reports may arrive out of input order; `DocumentReport::index` gives the
/// position. Batch-level progress events are not emitted.
pub fn classify_stream<P>(classifier: &Classifier, paths: impl IntoIterator<Item = P>) -> ReportStream
where
    P: AsRef<Path>,
{
    let paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
    Box::pin(fan_out(classifier, paths))
}

fn fan_out(classifier: &Classifier, paths: Vec<PathBuf>) -> impl Stream<Item = DocumentReport> + Send {
    let concurrency = classifier.config().concurrency.max(1);
    let classifier = classifier.clone();

    stream::iter(paths.into_iter().enumerate().map(move |(index, path)| {
        let classifier = classifier.clone();
        async move {
            let task_path = path.clone();
            let handle =
                tokio::spawn(async move { classifier.classify_report(index, &task_path).await });
            match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!("[{}] {}: task failed: {}", index, path.display(), e);
                    DocumentReport {
                        index,
                        classification: Classification::Error(ErrorOutput::new(
                            &path,
                            ClassifyError::Internal(format!("classification task failed: {e}"))
                                .to_string(),
                        )),
                        path,
                        stats: DocumentStats::default(),
                    }
                }
            }
        }
    }))
    .buffer_unordered(concurrency)
}

/// Write the classifications as a JSON array, in input order.
///
/// The file is written next to its destination and renamed into place, so
/// readers never observe a partial array.
pub async fn write_results(path: impl AsRef<Path>, reports: &[DocumentReport]) -> Result<(), ClassifyError> {
    let path = path.as_ref();
    let write_failed = |source: std::io::Error| ClassifyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut ordered: Vec<&DocumentReport> = reports.iter().collect();
    ordered.sort_by_key(|r| r.index);
    let records: Vec<&Classification> = ordered.iter().map(|r| &r.classification).collect();
    let json = serde_json::to_string_pretty(&records)
        .map_err(|e| ClassifyError::Internal(format!("result serialisation failed: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;

    info!("Wrote {} result(s) to {}", records.len(), path.display());
    Ok(())
}
