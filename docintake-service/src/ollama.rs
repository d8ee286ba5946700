use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::{OllamaError, ServiceError, ServiceResult};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ServiceError::Ollama(OllamaError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// True when the server is reachable and has the configured model pulled
    pub async fn model_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);

        let response = match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = resp.status().as_u16(), "Ollama tags request failed");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Ollama unreachable");
                return false;
            }
        };

        match response.json::<TagsResponse>().await {
            Ok(tags) => tags
                .models
                .iter()
                .any(|m| model_matches(&m.name, &self.config.model)),
            Err(e) => {
                warn!(error = %e, "Invalid tags response from Ollama");
                false
            }
        }
    }

    /// Generate a response constrained to JSON and deserialize it
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        messages: Vec<ChatMessage>,
    ) -> ServiceResult<T> {
        let content = self.chat(messages, Some("json")).await?;
        parse_json_reply(&content)
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        format: Option<&str>,
    ) -> ServiceResult<String> {
        let url = format!("{}/api/chat", self.config.base_url);
        let model = &self.config.model;

        let request = OllamaChatRequest {
            model: model.clone(),
            messages,
            stream: false,
            format: format.map(str::to_string),
            options: Some(OllamaOptions {
                temperature: Some(0.0), // Deterministic labels
            }),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();

            if message.contains("model") && message.contains("not found") {
                return Err(ServiceError::Ollama(OllamaError::ModelNotFound {
                    model: model.clone(),
                }));
            }

            return Err(ServiceError::Ollama(OllamaError::Generation {
                status,
                message,
            }));
        }

        let chat_response: OllamaChatResponse =
            response
                .json()
                .await
                .map_err(|e| OllamaError::InvalidResponse {
                    source: serde_json::Error::io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    )),
                })?;

        Ok(chat_response.message.content)
    }
}

/// `llama3.2` matches `llama3.2:latest`
fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || (!wanted.contains(':') && available.split(':').next() == Some(wanted))
}

/// Parse a model reply as JSON, tolerating prose or code fences around
/// the payload.
fn parse_json_reply<T: DeserializeOwned>(content: &str) -> ServiceResult<T> {
    let trimmed = content.trim();
    let first_error = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    if let (Some(start), Some(end)) = (start, end)
        && start < end
        && let Ok(value) = serde_json::from_str(&trimmed[start..=end])
    {
        return Ok(value);
    }

    Err(ServiceError::Ollama(OllamaError::InvalidResponse {
        source: first_error,
    }))
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Internal Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
