use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{BoxFuture, EmbeddingProvider};

/// Embeddings adapter for the Voyage AI API.
///
/// Inputs longer than `max_input_chars` are rejected before any network
/// round-trip; callers are expected to chunk first.
pub struct VoyageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
}

impl fmt::Debug for VoyageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoyageProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_input_chars", &self.max_input_chars)
            .finish()
    }
}

impl VoyageProvider {
    #[must_use]
    pub fn new(api_key: String, mut base_url: String, model: String, max_input_chars: usize) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_input_chars,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send_request(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!("Voyage API error {status}: {text}");
            return Err(LlmError::Provider {
                provider: "voyage",
                status: status.as_u16(),
            });
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse { provider: "voyage" })
    }
}

impl EmbeddingProvider for VoyageProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "voyage"
    }

    fn embed(&self, text: &str) -> BoxFuture<'_, Result<Vec<f32>, LlmError>> {
        let len = text.chars().count();
        let text = text.to_owned();
        Box::pin(async move {
            if len > self.max_input_chars {
                return Err(LlmError::OversizeInput {
                    len,
                    max: self.max_input_chars,
                });
            }
            self.send_request(&text).await
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> VoyageProvider {
        VoyageProvider::new(
            "vk-test-key".into(),
            "https://api.voyageai.com/v1".into(),
            "voyage-3".into(),
            1000,
        )
    }

    #[test]
    fn new_stores_fields() {
        let p = test_provider();
        assert_eq!(p.api_key, "vk-test-key");
        assert_eq!(p.base_url, "https://api.voyageai.com/v1");
        assert_eq!(p.model, "voyage-3");
        assert_eq!(p.max_input_chars, 1000);
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let p = VoyageProvider::new("k".into(), "https://api.voyageai.com/v1/".into(), "m".into(), 10);
        assert_eq!(p.base_url, "https://api.voyageai.com/v1");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = test_provider();
        let debug = format!("{p:?}");
        assert!(!debug.contains("vk-test-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn name_returns_voyage() {
        assert_eq!(test_provider().name(), "voyage");
    }

    #[test]
    fn embedding_request_serialization() {
        let body = EmbeddingRequest {
            input: "hello world",
            model: "voyage-3",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"input\":\"hello world\""));
        assert!(json.contains("\"model\":\"voyage-3\""));
    }

    #[test]
    fn parse_embedding_response() {
        let json = r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn embedding_response_empty_data() {
        let json = r#"{"data":[]}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert!(resp.data.is_empty());
    }

    #[tokio::test]
    async fn oversize_input_rejected_without_network() {
        let p = VoyageProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 8);
        let result = p.embed("this text is definitely too long").await;
        match result {
            Err(LlmError::OversizeInput { len, max }) => {
                assert!(len > max);
                assert_eq!(max, 8);
            }
            other => panic!("expected OversizeInput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn embed_unreachable_endpoint_errors() {
        let p = VoyageProvider::new("k".into(), "http://127.0.0.1:1".into(), "m".into(), 1000);
        assert!(p.embed("test").await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires MNEMA_VOYAGE_API_KEY env var"]
    async fn integration_voyage_embed() {
        let api_key =
            std::env::var("MNEMA_VOYAGE_API_KEY").expect("MNEMA_VOYAGE_API_KEY must be set");
        let provider = VoyageProvider::new(
            api_key,
            "https://api.voyageai.com/v1".into(),
            "voyage-3".into(),
            40_000,
        );
        let embedding = provider.embed("Hello world").await.unwrap();
        assert!(!embedding.is_empty());
    }
}
