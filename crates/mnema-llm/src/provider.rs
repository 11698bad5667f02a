//! Provider traits and the message model shared by all adapters.

use std::future::Future;
use std::pin::Pin;

use crate::error::LlmError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversational completion backend.
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    fn chat(&self, messages: &[Message]) -> BoxFuture<'_, Result<String, LlmError>>;
}

/// Text-to-vector backend.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>, LlmError>>;
}
