use std::collections::HashMap;

use serde::Serialize;

/// Payload field names shared between ingestion and retrieval.
pub mod meta {
    pub const SOURCE_PATH: &str = "source_path";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const TOTAL_CHUNKS: &str = "total_chunks";
    pub const INDEXED_AT: &str = "indexed_at";
    pub const TAG: &str = "tag";
}

/// One chunk ready for insertion: text, its embedding, and string metadata.
///
/// Every record carries a `source_path` metadata entry so all records for one
/// document can be retired together. Records are never mutated in place;
/// replacement is delete-then-insert.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A retrieval hit, ordered by descending similarity.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}
