//! Stage checkpoints: persisted intermediate outputs keyed by
//! (document identifier, stage number).
//!
//! A checkpoint is written only after its stage produced a validated
//! record, and is never mutated afterwards. Entries outlive the process so
//! an interrupted batch resumes from the last completed stage of each
//! document instead of paying for the LLM calls again.
//!
//! ## On-disk layout
//!
//! ```text
//! {dir}/{identifier}_step_1.md     OCR Markdown
//! {dir}/{identifier}_step_2.json   triage record
//! {dir}/{identifier}_step_3.json   specialist record
//! ```
//!
//! Writes go to a uniquely named temp file in the same directory and are
//! renamed over the target, so concurrent pipelines never observe a torn
//! file and never touch each other's keys. No store-wide lock is taken.

use crate::error::CheckpointError;
use crate::identifier::DocumentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pipeline position of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Document → Markdown transcription.
    Ocr,
    /// Coarse category assignment.
    Triage,
    /// Category-specific extraction.
    Specialist,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 3] = [Stage::Ocr, Stage::Triage, Stage::Specialist];

    /// 1-based stage number used in checkpoint keys.
    pub fn number(self) -> u8 {
        match self {
            Stage::Ocr => 1,
            Stage::Triage => 2,
            Stage::Specialist => 3,
        }
    }

    /// File suffix of the stored payload.
    pub fn suffix(self) -> &'static str {
        match self {
            Stage::Ocr => ".md",
            Stage::Triage | Stage::Specialist => ".json",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Ocr => "ocr",
            Stage::Triage => "triage",
            Stage::Specialist => "specialist",
        })
    }
}

/// Storage for stage checkpoints.
///
/// Implementations must tolerate concurrent calls for distinct identifiers.
/// Errors are reported to the caller but the pipeline never treats them as
/// fatal.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Whether a payload exists for `(id, stage)`.
    async fn has(&self, id: &DocumentId, stage: Stage) -> bool;

    /// Load the payload for `(id, stage)`, `Ok(None)` when absent.
    async fn load(&self, id: &DocumentId, stage: Stage) -> Result<Option<String>, CheckpointError>;

    /// Persist `payload` for `(id, stage)`.
    async fn save(&self, id: &DocumentId, stage: Stage, payload: &str) -> Result<(), CheckpointError>;
}

/// Filesystem-backed checkpoint store rooted at a scratch directory.
#[derive(Debug, Clone)]
pub struct FsCheckpointStore {
    dir: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default scratch directory: `$TMPDIR/ag_classifier`.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("ag_classifier")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the payload for `(id, stage)`.
    pub fn path_for(&self, id: &DocumentId, stage: Stage) -> PathBuf {
        self.dir
            .join(format!("{}_step_{}{}", id, stage.number(), stage.suffix()))
    }
}

#[async_trait]
impl CheckpointStore for FsCheckpointStore {
    async fn has(&self, id: &DocumentId, stage: Stage) -> bool {
        tokio::fs::try_exists(self.path_for(id, stage))
            .await
            .unwrap_or(false)
    }

    async fn load(&self, id: &DocumentId, stage: Stage) -> Result<Option<String>, CheckpointError> {
        let path = self.path_for(id, stage);
        match tokio::fs::read_to_string(&path).await {
            Ok(payload) => {
                debug!("Checkpoint hit: {} ({} bytes)", path.display(), payload.len());
                Ok(Some(payload))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::Io { path, source: e }),
        }
    }

    async fn save(&self, id: &DocumentId, stage: Stage, payload: &str) -> Result<(), CheckpointError> {
        let dir = self.dir.clone();
        let path = self.path_for(id, stage);
        let payload = payload.to_owned();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &payload))
            .await
            .map_err(|e| CheckpointError::Task(e.to_string()))?
    }
}

/// Write `payload` to `path` via a temp file in `dir` + rename.
fn write_atomic(dir: &Path, path: &Path, payload: &str) -> Result<(), CheckpointError> {
    let io_err = |source: std::io::Error| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(payload.as_bytes()).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!("Checkpoint stored: {}", path.display());
    Ok(())
}

/// A store that never holds anything. Used when checkpointing is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCheckpointStore;

#[async_trait]
impl CheckpointStore for DisabledCheckpointStore {
    async fn has(&self, _id: &DocumentId, _stage: Stage) -> bool {
        false
    }

    async fn load(&self, _id: &DocumentId, _stage: Stage) -> Result<Option<String>, CheckpointError> {
        Ok(None)
    }

    async fn save(&self, _id: &DocumentId, _stage: Stage, _payload: &str) -> Result<(), CheckpointError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> DocumentId {
        DocumentId::from_bytes(b"%PDF-1.7 checkpoint test")
    }

    #[test]
    fn stage_numbers_and_suffixes() {
        assert_eq!(Stage::Ocr.number(), 1);
        assert_eq!(Stage::Triage.number(), 2);
        assert_eq!(Stage::Specialist.number(), 3);
        assert_eq!(Stage::Ocr.suffix(), ".md");
        assert_eq!(Stage::Specialist.suffix(), ".json");
    }

    #[test]
    fn path_layout_matches_step_naming() {
        let store = FsCheckpointStore::new("/scratch");
        let p = store.path_for(&id(), Stage::Triage);
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, format!("{}_step_2.json", id()));
    }

    #[test]
    fn every_stage_has_its_own_file() {
        let store = FsCheckpointStore::new("/scratch");
        let names: Vec<String> = Stage::ALL
            .iter()
            .map(|&stage| {
                let p = store.path_for(&id(), stage);
                p.file_name().unwrap().to_string_lossy().to_string()
            })
            .collect();
        assert_eq!(
            names,
            [
                format!("{}_step_1.md", id()),
                format!("{}_step_2.json", id()),
                format!("{}_step_3.json", id()),
            ]
        );
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCheckpointStore::new(dir.path().join("nested"));

        assert!(!store.has(&id(), Stage::Ocr).await);
        assert!(store.load(&id(), Stage::Ocr).await.unwrap().is_none());

        store.save(&id(), Stage::Ocr, "# Factura 001\n").await.unwrap();

        assert!(store.has(&id(), Stage::Ocr).await);
        assert_eq!(
            store.load(&id(), Stage::Ocr).await.unwrap().as_deref(),
            Some("# Factura 001\n")
        );
        // Other stages of the same document are unaffected.
        assert!(!store.has(&id(), Stage::Triage).await);
    }

    #[tokio::test]
    async fn concurrent_saves_for_distinct_ids_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FsCheckpointStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = DocumentId::from_bytes(format!("doc-{i}").as_bytes());
                store
                    .save(&id, Stage::Triage, &format!("{{\"n\":{i}}}"))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        for i in 0..16 {
            let id = DocumentId::from_bytes(format!("doc-{i}").as_bytes());
            let payload = store.load(&id, Stage::Triage).await.unwrap().unwrap();
            assert_eq!(payload, format!("{{\"n\":{i}}}"));
        }
    }

    #[test]
    fn save_into_unwritable_location_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let store = FsCheckpointStore::new(&blocker);

        let result = tokio_test::block_on(store.save(&id(), Stage::Ocr, "text"));
        assert!(matches!(result, Err(CheckpointError::Io { .. })));
    }

    #[test]
    fn disabled_store_holds_nothing() {
        let store = DisabledCheckpointStore;
        tokio_test::block_on(async {
            store.save(&id(), Stage::Ocr, "text").await.unwrap();
            assert!(!store.has(&id(), Stage::Ocr).await);
            assert!(store.load(&id(), Stage::Ocr).await.unwrap().is_none());
        });
    }
}
