//! Test-only mock providers.

use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{BoxFuture, ChatProvider, EmbeddingProvider, Message};

/// Scripted chat provider: pops pre-seeded responses, then falls back to a
/// default.
#[derive(Debug, Clone)]
pub struct MockChat {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub fail: bool,
}

impl Default for MockChat {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            fail: false,
        }
    }
}

impl MockChat {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl ChatProvider for MockChat {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn chat(&self, _messages: &[Message]) -> BoxFuture<'_, Result<String, LlmError>> {
        Box::pin(async move {
            if self.fail {
                return Err(LlmError::Other("mock chat error".into()));
            }
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(self.default_response.clone())
            } else {
                Ok(responses.remove(0))
            }
        })
    }
}

/// Deterministic embedder: hashes words into buckets so distinct texts get
/// distinct vectors without any model behind them.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    pub dim: usize,
    pub fail: bool,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self {
            dim: 16,
            fail: false,
        }
    }
}

impl MockEmbedder {
    #[must_use]
    pub fn with_dim(dim: usize) -> Self {
        Self { dim, fail: false }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl EmbeddingProvider for MockEmbedder {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock-embed"
    }

    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>, LlmError>> {
        let text = text.to_owned();
        Box::pin(async move {
            if self.fail {
                return Err(LlmError::Other("mock embed error".into()));
            }
            let mut vector = vec![0.0f32; self.dim];
            for word in text.split_whitespace() {
                let mut h: usize = 5381;
                for b in word.bytes() {
                    h = h.wrapping_mul(33).wrapping_add(b as usize);
                }
                vector[h % self.dim] += 1.0;
            }
            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
            Ok(vector)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_chat_pops_responses_in_order() {
        let chat = MockChat::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(chat.chat(&[]).await.unwrap(), "first");
        assert_eq!(chat.chat(&[]).await.unwrap(), "second");
        assert_eq!(chat.chat(&[]).await.unwrap(), "mock response");
    }

    #[tokio::test]
    async fn mock_chat_failing_errors() {
        let chat = MockChat::failing();
        assert!(chat.chat(&[]).await.is_err());
    }

    #[tokio::test]
    async fn mock_embedder_deterministic() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_embedder_distinct_texts_distinct_vectors() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed("rust borrow checker").await.unwrap();
        let b = embedder.embed("gardening in spring").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn mock_embedder_unit_norm() {
        let embedder = MockEmbedder::default();
        let v = embedder.embed("some words here").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn mock_embedder_failing_errors() {
        let embedder = MockEmbedder::failing();
        assert!(embedder.embed("x").await.is_err());
    }
}
