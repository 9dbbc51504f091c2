//! Chat Completion Client
//!
//! OpenAI-compatible chat completions for both the hosted API and Ollama's
//! `/v1` endpoint. Image parts are shaped by the configured [`ImageEncoding`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{CompletionBackend, Config, ImageEncoding};

/// One piece of user content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded PNG
    Image(String),
}

/// System instruction plus user content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: Vec<ContentPart>,
}

impl Prompt {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: impl IntoIterator<Item = ContentPart>) -> Self {
        self.user.extend(images);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.user.push(ContentPart::Text(text.into()));
        self
    }

    /// Concatenated text parts (logging, manual review)
    pub fn user_text(&self) -> String {
        self.user
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(t) => Some(t.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.user
            .iter()
            .filter(|p| matches!(p, ContentPart::Image(_)))
            .count()
    }
}

/// Text completion capability
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Shape a base64 PNG for the request body
pub fn encode_image_part(image_b64: &str, encoding: ImageEncoding) -> Value {
    let data_uri = format!("data:image/png;base64,{}", image_b64);
    match encoding {
        ImageEncoding::Inline => json!({
            "type": "image_url",
            "image_url": data_uri,
        }),
        ImageEncoding::Nested => json!({
            "type": "image_url",
            "image_url": {
                "url": data_uri,
                "detail": "high",
            },
        }),
    }
}

fn encode_part(part: &ContentPart, encoding: ImageEncoding) -> Value {
    match part {
        ContentPart::Text(text) => json!({ "type": "text", "text": text }),
        ContentPart::Image(b64) => encode_image_part(b64, encoding),
    }
}

/// Message in the request
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Value,
}

/// API request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

/// API response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat client
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    encoding: ImageEncoding,
}

impl ChatClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        model: &str,
        temperature: f32,
        timeout: Duration,
        encoding: ImageEncoding,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            model: model.to_string(),
            temperature,
            encoding,
        }
    }

    /// Create from config
    pub fn from_config(config: &Config) -> Self {
        let endpoint = match config.completion_backend {
            CompletionBackend::Ollama => {
                format!("{}/v1/chat/completions", config.ollama_url.trim_end_matches('/'))
            }
            CompletionBackend::OpenAi => {
                format!("{}/chat/completions", config.openai_base_url.trim_end_matches('/'))
            }
        };
        let api_key = match config.completion_backend {
            CompletionBackend::Ollama => None,
            CompletionBackend::OpenAi => config.openai_api_key.as_deref(),
        };

        Self::new(
            &endpoint,
            api_key,
            &config.completion_model,
            config.temperature,
            config.request_timeout,
            config.image_encoding,
        )
    }

    fn build_messages(&self, prompt: &Prompt) -> Vec<ChatMessage> {
        let parts: Vec<Value> = prompt
            .user
            .iter()
            .map(|p| encode_part(p, self.encoding))
            .collect();

        vec![
            ChatMessage {
                role: "system",
                content: Value::String(prompt.system.clone()),
            },
            ChatMessage {
                role: "user",
                content: Value::Array(parts),
            },
        ]
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: self.build_messages(prompt),
        };

        debug!(
            model = %self.model,
            images = prompt.image_count(),
            prompt_len = prompt.user_text().len(),
            "Calling chat completion"
        );

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API error {}: {}", status, text);
        }

        let result: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        info!(model = %self.model, len = content.len(), "Completion received");
        Ok(content)
    }
}

/// Shared handle used across components
pub type SharedCompletion = Arc<dyn CompletionClient>;
