//! Retrieval-augmented question answering over the note index.

use std::sync::Arc;

use mnema_llm::{ChatProvider, Message};
use mnema_memory::{MemoryError, NoteIndex, ScoredChunk};
use serde::Serialize;
use tracing::{debug, warn};

/// Stands in for the document context when retrieval finds nothing, so the
/// model states the gap instead of answering from thin air.
pub const NO_RESULTS_CONTEXT: &str = "No relevant information found in the knowledge base.";

const OPTIMIZER_PROMPT: &str = "You are a search query optimizer. Your job is to take a user's \
question and convert it into the best possible search terms for a vector database containing \
notes and documentation.\n\
\n\
Rules:\n\
- Focus on key concepts, not question words\n\
- Remove filler words like \"how\", \"what\", \"can you\", etc.\n\
- Include synonyms and related terms\n\
- Keep it concise but comprehensive\n\
- Return only the optimized search terms, no explanation";

const ANSWER_PROMPT: &str = "You are a helpful assistant that answers questions using the \
provided knowledge base information.\n\
\n\
Instructions:\n\
- Use the provided context to answer the user's question\n\
- If the context doesn't contain enough information, say so clearly\n\
- Be accurate and don't make up information not present in the context\n\
- Always cite the specific documents you used, as Document 1, Document 2, and so on\n\
- For math equations use $${math}$$ for display math or ${math}$ for inline math";

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("answer synthesis failed: {0}")]
    Synthesis(String),
}

/// A synthesized answer together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub optimized_query: String,
    pub sources: Vec<ScoredChunk>,
}

/// Four-step pipeline: optimize the query, embed and retrieve, assemble a
/// context prompt, synthesize an answer.
pub struct QueryPipeline {
    chat: Arc<dyn ChatProvider>,
    index: Arc<NoteIndex>,
    top_k: u64,
}

impl std::fmt::Debug for QueryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPipeline")
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl QueryPipeline {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatProvider>, index: Arc<NoteIndex>, top_k: u64) -> Self {
        Self { chat, index, top_k }
    }

    /// Answer `question` from the indexed notes.
    ///
    /// Query optimization is best-effort: if the model call fails or returns
    /// nothing, the question is used verbatim. When retrieval comes back
    /// empty the context becomes [`NO_RESULTS_CONTEXT`] and synthesis still
    /// runs, so the model states the gap in its own words.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyQuery`] for blank input,
    /// [`QueryError::Retrieval`] if embedding or search fails, or
    /// [`QueryError::Synthesis`] if the answer call fails.
    pub async fn ask(&self, question: &str) -> Result<QueryOutcome, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let optimized = self.optimize(question).await;
        let sources = self.retrieve(&optimized, self.top_k).await?;
        if sources.is_empty() {
            debug!("retrieval empty, answering from the no-results marker");
        }

        let context = assemble_context(&sources);
        let messages = [
            Message::system(format!("{ANSWER_PROMPT}\n\nContext:\n{context}")),
            Message::user(question),
        ];
        let answer = self
            .chat
            .chat(&messages)
            .await
            .map_err(|e| QueryError::Synthesis(e.to_string()))?;

        Ok(QueryOutcome {
            answer,
            optimized_query: optimized,
            sources,
        })
    }

    /// Retrieval without synthesis: embed `query` verbatim and return the
    /// scored chunks. `limit` falls back to the pipeline's `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::EmptyQuery`] for blank input or
    /// [`QueryError::Retrieval`] if embedding or search fails.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<u64>,
    ) -> Result<Vec<ScoredChunk>, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        self.retrieve(query, limit.unwrap_or(self.top_k)).await
    }

    async fn optimize(&self, question: &str) -> String {
        let messages = [Message::system(OPTIMIZER_PROMPT), Message::user(question)];
        match self.chat.chat(&messages).await {
            Ok(optimized) if !optimized.trim().is_empty() => {
                let optimized = optimized.trim().to_owned();
                debug!(%optimized, "query optimized");
                optimized
            }
            Ok(_) => {
                warn!("optimizer returned nothing, using question verbatim");
                question.to_owned()
            }
            Err(e) => {
                warn!(error = %e, "query optimization failed, using question verbatim");
                question.to_owned()
            }
        }
    }

    async fn retrieve(&self, query: &str, limit: u64) -> Result<Vec<ScoredChunk>, QueryError> {
        match self.index.query_by_text(query, limit).await {
            Ok(hits) => Ok(hits),
            Err(MemoryError::EmptyQuery) => Err(QueryError::EmptyQuery),
            Err(e) => Err(QueryError::Retrieval(e.to_string())),
        }
    }
}

fn assemble_context(sources: &[ScoredChunk]) -> String {
    if sources.is_empty() {
        return NO_RESULTS_CONTEXT.to_owned();
    }
    let mut context = String::from("Relevant information from the knowledge base:\n\n");
    for (i, chunk) in sources.iter().enumerate() {
        context.push_str(&format!("--- Document {} ---\n{}\n\n", i + 1, chunk.content));
    }
    context
}
