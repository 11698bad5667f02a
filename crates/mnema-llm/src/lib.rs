//! Chat and embedding provider adapters with a dyn-usable trait surface.

pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod provider;
pub mod voyage;

pub use error::LlmError;
pub use provider::{ChatProvider, EmbeddingProvider, Message, Role};
