#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("record id must not be empty")]
    EmptyId,

    #[error("record content must not be empty")]
    EmptyContent,

    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("vector store error: {0}")]
    Store(#[from] crate::vector_store::VectorStoreError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] mnema_llm::LlmError),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
