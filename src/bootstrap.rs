//! Wires configuration into live components.

use std::sync::Arc;

use anyhow::Context;
use mnema_core::{Config, GitNoteSource, QueryPipeline, SyncOrchestrator};
use mnema_llm::openai::OpenAiProvider;
use mnema_llm::voyage::VoyageProvider;
use mnema_llm::{ChatProvider, EmbeddingProvider};
use mnema_memory::NoteIndex;
use mnema_memory::qdrant::QdrantStore;

pub(crate) struct Components {
    pub sync: Arc<SyncOrchestrator>,
    pub query: Arc<QueryPipeline>,
    pub index: Arc<NoteIndex>,
}

pub(crate) fn build(config: &Config) -> anyhow::Result<Components> {
    let chat: Arc<dyn ChatProvider> = Arc::new(OpenAiProvider::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        config.openai_model.clone(),
    ));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(VoyageProvider::new(
        config.voyage_api_key.clone(),
        config.voyage_base_url.clone(),
        config.voyage_model.clone(),
        config.voyage_max_input_chars,
    ));

    let store = QdrantStore::new(&config.qdrant_url)
        .with_context(|| format!("connecting qdrant client to {}", config.qdrant_url))?;
    let index = Arc::new(NoteIndex::new(
        Arc::new(store),
        Arc::clone(&embedder),
        config.collection.clone(),
    ));

    let source = Arc::new(GitNoteSource::new(
        config.repo_url.clone(),
        config.repo_dir.clone(),
        config.repo_username.clone(),
        config.repo_token.clone(),
    ));

    let sync = Arc::new(SyncOrchestrator::new(
        source,
        Arc::clone(&index),
        embedder,
        config.chunk_max_chars,
        config.chunk_overlap,
        config.source_tag.clone(),
    ));
    let query = Arc::new(QueryPipeline::new(chat, Arc::clone(&index), config.top_k));

    Ok(Components { sync, query, index })
}
