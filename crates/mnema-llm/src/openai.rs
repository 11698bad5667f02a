use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{BoxFuture, ChatProvider, Message, Role};

/// Chat-completions adapter for the OpenAI API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: String, mut base_url: String, model: String) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send_request(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
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
            tracing::error!("OpenAI API error {status}: {text}");
            return Err(LlmError::Provider {
                provider: "openai",
                status: status.as_u16(),
            });
        }

        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }
}

impl ChatProvider for OpenAiProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }

    fn chat(&self, messages: &[Message]) -> BoxFuture<'_, Result<String, LlmError>> {
        let messages = messages.to_vec();
        Box::pin(async move {
            match self.send_request(&messages).await {
                Ok(text) => Ok(text),
                Err(LlmError::RateLimited) => {
                    tracing::warn!("OpenAI rate limited, retrying in 1s");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    self.send_request(&messages).await
                }
                Err(e) => Err(e),
            }
        })
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            ApiMessage {
                role,
                content: &msg.content,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test-key".into(),
            "https://api.openai.com/v1".into(),
            "gpt-4o".into(),
        )
    }

    #[test]
    fn new_stores_fields() {
        let p = test_provider();
        assert_eq!(p.api_key, "sk-test-key");
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.model, "gpt-4o");
    }

    #[test]
    fn base_url_strips_trailing_slash() {
        let p = OpenAiProvider::new("key".into(), "https://api.openai.com/v1/".into(), "m".into());
        assert_eq!(p.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = test_provider();
        let debug = format!("{p:?}");
        assert!(!debug.contains("sk-test-key"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("gpt-4o"));
    }

    #[test]
    fn name_returns_openai() {
        assert_eq!(test_provider().name(), "openai");
    }

    #[test]
    fn chat_request_serialization() {
        let msgs = [ApiMessage {
            role: "user",
            content: "hello",
        }];
        let body = ChatRequest {
            model: "gpt-4o",
            messages: &msgs,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"model\":\"gpt-4o\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"hello\""));
    }

    #[test]
    fn parse_chat_response() {
        let json = r#"{"choices":[{"message":{"content":"Hello!"}}]}"#;
        let resp: OpenAiChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].message.content, "Hello!");
    }

    #[test]
    fn chat_response_empty_choices() {
        let json = r#"{"choices":[]}"#;
        let resp: OpenAiChatResponse = serde_json::from_str(json).unwrap();
        assert!(resp.choices.is_empty());
    }

    #[test]
    fn convert_messages_maps_roles() {
        let messages = vec![
            Message::system("system prompt"),
            Message::user("user msg"),
            Message::assistant("assistant reply"),
        ];
        let api_msgs = convert_messages(&messages);
        assert_eq!(api_msgs.len(), 3);
        assert_eq!(api_msgs[0].role, "system");
        assert_eq!(api_msgs[0].content, "system prompt");
        assert_eq!(api_msgs[1].role, "user");
        assert_eq!(api_msgs[2].role, "assistant");
    }

    #[tokio::test]
    async fn chat_unreachable_endpoint_errors() {
        let p = OpenAiProvider::new("key".into(), "http://127.0.0.1:1".into(), "model".into());
        let messages = vec![Message::user("test")];
        assert!(p.chat(&messages).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires MNEMA_OPENAI_API_KEY env var"]
    async fn integration_openai_chat() {
        let api_key =
            std::env::var("MNEMA_OPENAI_API_KEY").expect("MNEMA_OPENAI_API_KEY must be set");
        let provider = OpenAiProvider::new(
            api_key,
            "https://api.openai.com/v1".into(),
            "gpt-4o".into(),
        );

        let messages = vec![Message::user("Reply with exactly: pong")];
        let response = provider.chat(&messages).await.unwrap();
        assert!(response.to_lowercase().contains("pong"));
    }
}
