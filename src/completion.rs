//! Chat-completion client.
//!
//! [`CompletionClient`] is the seam the chat loop talks to; [`OllamaChat`]
//! implements it against Ollama's non-streaming `POST /api/chat`:
//!
//! ```text
//! → {"model": "mistral", "messages": [{"role": "system", "content": "…"}, …], "stream": false}
//! ← {"message": {"role": "assistant", "content": "…"}, …}
//! ```

use anyhow::Result;
use async_trait::async_trait;
use memchat_core::models::Message;
use memchat_core::ChatError;

use crate::config::CompletionConfig;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` to `model` and return the assistant reply text.
    async fn complete(&self, model: &str, messages: &[Message]) -> memchat_core::Result<String>;
}

pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
}

impl OllamaChat {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

#[async_trait]
impl CompletionClient for OllamaChat {
    async fn complete(&self, model: &str, messages: &[Message]) -> memchat_core::Result<String> {
        tracing::debug!(model, messages = messages.len(), "sending chat request");
        self.chat(model, messages)
            .await
            .map_err(|e| ChatError::CompletionFailed(e.to_string()))
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}
