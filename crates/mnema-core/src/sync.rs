//! Incremental sync from the note source into the vector index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use mnema_llm::{EmbeddingProvider, LlmError};
use mnema_memory::{MemoryError, NoteIndex, VectorRecord, chunker, classifier, meta};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repo::{NoteSource, RepoError};

const INDEXABLE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("repository sync failed: {0}")]
    Repo(#[from] RepoError),

    #[error("index not ready: {0}")]
    Index(#[from] MemoryError),

    #[error("sync aborted at {path}: {reason}")]
    Aborted { path: String, reason: String },

    #[error("sync cancelled")]
    Cancelled,
}

/// What one sync pass is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Diffing,
    Processing,
}

/// Outcome of one completed sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub processed_count: usize,
    pub skipped_count: usize,
    pub duration_ms: u64,
}

/// Drives one sync pass at a time: pull changes from the source, re-chunk and
/// re-embed each changed note, and replace its records in the index.
///
/// Passes are serialized through an internal lock; a second caller waits for
/// the running pass to finish. Replacement is delete-then-insert, so chunk
/// counts shrinking between versions never leaves stale tails behind.
pub struct SyncOrchestrator {
    source: Arc<dyn NoteSource>,
    index: Arc<NoteIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_max_chars: usize,
    chunk_overlap: f32,
    source_tag: Option<String>,
    pass_lock: tokio::sync::Mutex<()>,
    phase: RwLock<SyncPhase>,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("chunk_max_chars", &self.chunk_max_chars)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("source_tag", &self.source_tag)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(
        source: Arc<dyn NoteSource>,
        index: Arc<NoteIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunk_max_chars: usize,
        chunk_overlap: f32,
        source_tag: Option<String>,
    ) -> Self {
        Self {
            source,
            index,
            embedder,
            chunk_max_chars,
            chunk_overlap,
            source_tag,
            pass_lock: tokio::sync::Mutex::new(()),
            phase: RwLock::new(SyncPhase::Idle),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.phase.read().map_or(SyncPhase::Idle, |p| *p)
    }

    fn set_phase(&self, phase: SyncPhase) {
        if let Ok(mut p) = self.phase.write() {
            *p = phase;
        }
    }

    /// Run one sync pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Index`] if the collection cannot be bootstrapped,
    /// [`SyncError::Repo`] if the source cannot be synced,
    /// [`SyncError::Aborted`] naming the note that failed mid-pass, or
    /// [`SyncError::Cancelled`] if `cancel` fires between notes. Work already
    /// committed to the index stays committed.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let _pass = self.pass_lock.lock().await;
        let result = self.run_inner(cancel).await;
        self.set_phase(SyncPhase::Idle);
        result
    }

    async fn run_inner(&self, cancel: &CancellationToken) -> Result<SyncReport, SyncError> {
        let started = Instant::now();

        // No-op once bootstrapped; re-runs collection setup if it failed at
        // startup (dependencies down) so a later pass can still succeed.
        self.index.ensure_ready().await?;

        self.set_phase(SyncPhase::Diffing);
        let changed = self.source.ensure_up_to_date().await?;
        info!(changed = changed.len(), "sync pass starting");

        self.set_phase(SyncPhase::Processing);
        let mut processed = Vec::new();
        let mut skipped = Vec::new();

        for path in changed {
            if cancel.is_cancelled() {
                warn!(
                    processed = processed.len(),
                    "sync cancelled, committed work is kept"
                );
                return Err(SyncError::Cancelled);
            }
            if self.process_note(&path).await? {
                processed.push(path);
            } else {
                skipped.push(path);
            }
        }

        let report = SyncReport {
            processed_count: processed.len(),
            skipped_count: skipped.len(),
            processed,
            skipped,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        info!(
            processed = report.processed_count,
            skipped = report.skipped_count,
            duration_ms = report.duration_ms,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Re-index one note. Returns `false` when the note was skipped.
    async fn process_note(&self, path: &str) -> Result<bool, SyncError> {
        if !has_indexable_extension(path) {
            debug!(path, "skipped: extension not indexed");
            return Ok(false);
        }

        let content = match self.source.read(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path, error = %e, "skipped: unreadable");
                return Ok(false);
            }
        };

        // Stale chunks go first so a note shrinking or turning into pure
        // scaffolding leaves nothing behind.
        self.index
            .delete_by_source(path)
            .await
            .map_err(|e| SyncError::Aborted {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;

        if !classifier::is_indexable(&content) {
            debug!(path, "skipped: no indexable content");
            return Ok(false);
        }

        let chunks = chunker::chunk(&content, self.chunk_max_chars, self.chunk_overlap);
        let total = chunks.len();
        let indexed_at = chrono::Utc::now().to_rfc3339();

        let mut records = Vec::with_capacity(total);
        for (ordinal, chunk) in chunks.into_iter().enumerate() {
            let embedding =
                self.embed_with_retry(&chunk)
                    .await
                    .map_err(|e| SyncError::Aborted {
                        path: path.to_owned(),
                        reason: e.to_string(),
                    })?;

            let mut metadata = HashMap::from([
                (meta::SOURCE_PATH.to_owned(), path.to_owned()),
                (meta::CHUNK_INDEX.to_owned(), ordinal.to_string()),
                (meta::TOTAL_CHUNKS.to_owned(), total.to_string()),
                (meta::INDEXED_AT.to_owned(), indexed_at.clone()),
            ]);
            if let Some(tag) = &self.source_tag {
                metadata.insert(meta::TAG.to_owned(), tag.clone());
            }

            records.push(VectorRecord {
                id: chunk_id(path, ordinal),
                content: chunk,
                embedding,
                metadata,
            });
        }

        self.index
            .upsert(records)
            .await
            .map_err(|e| SyncError::Aborted {
                path: path.to_owned(),
                reason: e.to_string(),
            })?;
        debug!(path, chunks = total, "note indexed");
        Ok(true)
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        match self.embedder.embed(text).await {
            Err(LlmError::RateLimited) => {
                warn!("embedding rate limited, retrying once");
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.embedder.embed(text).await
            }
            other => other,
        }
    }
}

fn has_indexable_extension(path: &str) -> bool {
    std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| INDEXABLE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Stable chunk id derived from the source path and chunk ordinal, so
/// re-indexing a note overwrites its previous records.
#[must_use]
pub fn chunk_id(source_path: &str, ordinal: usize) -> String {
    let name = format!("{source_path}#{ordinal}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}
