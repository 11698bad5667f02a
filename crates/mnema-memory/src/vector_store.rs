//! Storage-agnostic vector store interface.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("vector store connection failed: {0}")]
    Connection(String),

    #[error("collection operation failed: {0}")]
    Collection(String),

    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("search failed: {0}")]
    Search(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("count failed: {0}")]
    Count(String),
}

pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// A point ready for insertion into a collection.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// A similarity search hit with its payload.
#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

/// Backend operations needed by the note index.
///
/// Methods return boxed futures so implementations can live behind
/// `Arc<dyn VectorStore>`.
pub trait VectorStore: Send + Sync {
    /// Create `collection` with the given vector dimensionality if it does
    /// not already exist.
    fn ensure_collection<'a>(
        &'a self,
        collection: &'a str,
        vector_size: u64,
    ) -> BoxFuture<'a, Result<()>>;

    fn upsert<'a>(
        &'a self,
        collection: &'a str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'a, Result<()>>;

    fn search<'a>(
        &'a self,
        collection: &'a str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'a, Result<Vec<ScoredVectorPoint>>>;

    /// Delete every point whose payload `field` equals `value`, returning how
    /// many points matched.
    fn delete_by_field<'a>(
        &'a self,
        collection: &'a str,
        field: &'a str,
        value: &'a str,
    ) -> BoxFuture<'a, Result<u64>>;

    fn count_all<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<u64>>;
}
