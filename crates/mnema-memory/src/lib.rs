//! Note chunking, content classification, and vector index access.

pub mod chunker;
pub mod classifier;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod in_memory;
pub mod index;
pub mod qdrant;
pub mod types;
pub mod vector_store;

pub use error::MemoryError;
#[cfg(any(test, feature = "mock"))]
pub use in_memory::InMemoryVectorStore;
pub use index::NoteIndex;
pub use types::{ScoredChunk, VectorRecord, meta};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
