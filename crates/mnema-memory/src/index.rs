//! High-level note index over a [`VectorStore`] and an embedding provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use mnema_llm::EmbeddingProvider;
use tracing::{debug, warn};

use crate::error::{MemoryError, Result};
use crate::types::{ScoredChunk, VectorRecord};
use crate::vector_store::{VectorPoint, VectorStore};

const CONTENT_FIELD: &str = "content";

/// Chunk storage and retrieval for one collection.
///
/// Keeps an approximate point count updated on every insert and delete. The
/// counter is advisory: it is seeded from the store at startup and drifts if
/// other writers touch the collection.
pub struct NoteIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    approx_count: AtomicI64,
    ready: AtomicBool,
}

impl std::fmt::Debug for NoteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteIndex")
            .field("collection", &self.collection)
            .field("approx_count", &self.approx_count.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl NoteIndex {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            approx_count: AtomicI64::new(0),
            ready: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection if needed and seed the approximate counter.
    ///
    /// The vector dimensionality is discovered by embedding a short probe
    /// string, so the collection always matches whatever model the embedder
    /// is configured with. Counter seeding is best-effort: a count failure is
    /// logged and the counter starts at zero.
    ///
    /// Idempotent and retriable: once a call has succeeded, later calls
    /// return immediately, so callers can re-run this before every write
    /// pass to recover from a failed bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe embedding or collection creation fails.
    pub async fn ensure_ready(&self) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            return Ok(());
        }
        let probe = self.embedder.embed("probe").await?;
        self.store
            .ensure_collection(&self.collection, probe.len() as u64)
            .await?;
        match self.store.count_all(&self.collection).await {
            Ok(count) => {
                #[allow(clippy::cast_possible_wrap)]
                self.approx_count.store(count as i64, Ordering::Relaxed);
                debug!(collection = %self.collection, count, "index ready");
            }
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "count unavailable, counter starts at zero");
            }
        }
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Insert pre-embedded records.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::EmptyId`] or [`MemoryError::EmptyContent`] if a
    /// record is missing either, or a store error if the upsert fails.
    pub async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut points = Vec::with_capacity(records.len());
        for record in records {
            if record.id.trim().is_empty() {
                return Err(MemoryError::EmptyId);
            }
            if record.content.trim().is_empty() {
                return Err(MemoryError::EmptyContent);
            }
            let mut payload: HashMap<String, serde_json::Value> = record
                .metadata
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect();
            payload.insert(
                CONTENT_FIELD.to_owned(),
                serde_json::Value::String(record.content),
            );
            points.push(VectorPoint {
                id: record.id,
                vector: record.embedding,
                payload,
            });
        }
        #[allow(clippy::cast_possible_wrap)]
        let inserted = points.len() as i64;
        self.store.upsert(&self.collection, points).await?;
        self.approx_count.fetch_add(inserted, Ordering::Relaxed);
        Ok(())
    }

    /// Search with an already-computed query vector.
    ///
    /// Asking for more results than the collection holds is not an error; the
    /// store simply returns fewer hits.
    ///
    /// # Errors
    ///
    /// Returns a store error if the search fails.
    pub async fn query_by_vector(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<ScoredChunk>> {
        let hits = self.store.search(&self.collection, vector, limit).await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let mut content = String::new();
                let mut metadata = HashMap::new();
                for (k, v) in hit.payload {
                    let Some(s) = v.as_str() else { continue };
                    if k == CONTENT_FIELD {
                        content = s.to_owned();
                    } else {
                        metadata.insert(k, s.to_owned());
                    }
                }
                ScoredChunk {
                    id: hit.id,
                    content,
                    score: hit.score,
                    metadata,
                }
            })
            .collect())
    }

    /// Embed `text` and search for similar chunks.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::EmptyQuery`] for blank input, an embedding
    /// error, or a store error if the search fails.
    pub async fn query_by_text(&self, text: &str, limit: u64) -> Result<Vec<ScoredChunk>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MemoryError::EmptyQuery);
        }
        let vector = self.embedder.embed(text).await?;
        self.query_by_vector(vector, limit).await
    }

    /// Remove every chunk stored for `source_path`, returning how many were
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns a store error if the deletion fails.
    pub async fn delete_by_source(&self, source_path: &str) -> Result<u64> {
        let removed = self
            .store
            .delete_by_field(&self.collection, crate::types::meta::SOURCE_PATH, source_path)
            .await?;
        if removed > 0 {
            #[allow(clippy::cast_possible_wrap)]
            let n = removed as i64;
            // Clamp at zero so a drifted counter never goes negative.
            let _ = self
                .approx_count
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                    Some((c - n).max(0))
                });
        }
        Ok(removed)
    }

    /// Approximate number of points in the collection.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn approximate_count(&self) -> u64 {
        self.approx_count.load(Ordering::Relaxed).max(0) as u64
    }
}
