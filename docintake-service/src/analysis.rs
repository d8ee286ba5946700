//! Text analysis: classification, entity and key-value extraction,
//! summarization.

pub mod classify;
pub mod entities;
pub mod key_values;
pub mod summarize;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::{ServiceError, ServiceResult, format_error_chain_ref};
use crate::models::{Classification, DocumentType, Entity};
use crate::ollama::{ChatMessage, OllamaClient};

/// Characters of input shown to the model classifier
const MODEL_CLASSIFY_CHARS: usize = 512;

const CLASSIFY_SYSTEM_PROMPT: &str = "You classify business documents. \
Reply with JSON only: {\"type\": <label>, \"confidence\": <number between 0 and 1>}.";

const NER_SYSTEM_PROMPT: &str = "You are a named entity recognizer. \
Tag people (PER), organizations (ORG), locations (LOC) and other named entities (MISC). \
Copy each entity text exactly as it appears in the input. \
Reply with JSON only: {\"entities\": [{\"text\": <span>, \"type\": <PER|ORG|LOC|MISC>, \"score\": <number between 0 and 1>}]}.";

#[derive(Debug, Deserialize)]
struct ModelClassification {
    #[serde(rename = "type", alias = "label")]
    label: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Rule tables plus optional model-backed fallbacks
pub struct AiProcessor {
    ollama: Option<Arc<OllamaClient>>,
    summary_sentences: usize,
    summary_min_chars: usize,
}

impl AiProcessor {
    /// `ollama` is `None` when the model backend is disabled
    pub fn new(ollama: Option<Arc<OllamaClient>>, config: &AnalysisConfig) -> Self {
        Self {
            ollama,
            summary_sentences: config.summary_sentences,
            summary_min_chars: config.summary_min_chars,
        }
    }

    /// Whether the model backend is configured and serving the model
    pub async fn model_available(&self) -> bool {
        match &self.ollama {
            Some(client) => client.model_available().await,
            None => false,
        }
    }

    /// Keyword rules first, then the model; `other` (0.5) if the model is
    /// disabled or fails.
    pub async fn classify(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            return classify::EMPTY;
        }

        if let Some(classification) = classify::classify_by_keywords(text) {
            debug!(
                document_type = %classification.document_type,
                "Classified by keyword rules"
            );
            return classification;
        }

        let Some(client) = &self.ollama else {
            return classify::FALLBACK;
        };

        match self.classify_with_model(client, text).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %format_error_chain_ref(&e), "Model classification failed");
                classify::FALLBACK
            }
        }
    }

    async fn classify_with_model(
        &self,
        client: &OllamaClient,
        text: &str,
    ) -> ServiceResult<Classification> {
        let labels = classify::MODEL_LABELS
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let excerpt = entities::char_prefix(text, MODEL_CLASSIFY_CHARS);

        let messages = vec![
            ChatMessage::system(CLASSIFY_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Labels: {}\n\nDocument:\n{}",
                labels, excerpt
            )),
        ];

        let reply: ModelClassification = client.generate_json(messages).await?;
        let document_type = DocumentType::from_str(reply.label.trim())
            .ok()
            .filter(|t| classify::MODEL_LABELS.contains(t))
            .ok_or_else(|| ServiceError::Internal {
                message: format!("Model returned unknown label '{}'", reply.label),
            })?;

        Ok(Classification {
            document_type,
            confidence: reply.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        })
    }

    /// Pattern tagger output followed by model tagger output, not
    /// deduplicated. A failing tagger is logged and skipped.
    pub async fn extract_entities(&self, text: &str) -> Vec<Entity> {
        let mut found = entities::pattern_entities(text);

        if let Some(client) = &self.ollama {
            match self.model_entities(client, text).await {
                Ok(model_found) => found.extend(model_found),
                Err(e) => {
                    warn!(error = %format_error_chain_ref(&e), "Model entity tagging failed");
                }
            }
        }

        found
    }

    async fn model_entities(&self, client: &OllamaClient, text: &str) -> ServiceResult<Vec<Entity>> {
        let window = entities::char_prefix(text, entities::MODEL_WINDOW_CHARS);
        if window.trim().is_empty() {
            return Ok(Vec::new());
        }

        let messages = vec![
            ChatMessage::system(NER_SYSTEM_PROMPT),
            ChatMessage::user(window),
        ];
        let reply: entities::ModelEntityReply = client.generate_json(messages).await?;
        debug!(model = client.model(), spans = reply.entities.len(), "Model tagger replied");

        Ok(entities::resolve_model_entities(window, reply.entities))
    }

    pub fn extract_key_value_pairs(&self, text: &str) -> BTreeMap<String, String> {
        key_values::extract_key_value_pairs(text)
    }

    /// Summary for text longer than the configured minimum
    pub fn summarize(&self, text: &str) -> Option<String> {
        if text.chars().count() <= self.summary_min_chars {
            return None;
        }
        Some(summarize::summarize(text, self.summary_sentences))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn processor() -> AiProcessor {
        AiProcessor::new(None, &AppConfig::default().analysis)
    }

    #[tokio::test]
    async fn test_classify_empty_text() {
        let c = processor().classify("   \n ").await;
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_classify_without_model_falls_back() {
        let c = processor().classify("Minutes of the garden club").await;
        assert_eq!(c.document_type, DocumentType::Other);
        assert_eq!(c.confidence, 0.5);

        let c = processor().classify("Amount due: $40").await;
        assert_eq!(c.document_type, DocumentType::Invoice);
    }

    #[tokio::test]
    async fn test_unreachable_model_falls_back() {
        let mut config = AppConfig::default().ollama;
        config.base_url = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = 2;
        let client = Arc::new(OllamaClient::new(config).unwrap());
        let ai = AiProcessor::new(Some(client), &AppConfig::default().analysis);

        let c = ai.classify("Minutes of the garden club").await;
        assert_eq!(c, classify::FALLBACK);

        // Pattern entities survive a failing model tagger
        let found = ai.extract_entities("Email ops@example.com today").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].label, "EMAIL");

        assert!(!ai.model_available().await);
    }

    #[tokio::test]
    async fn test_entities_without_model() {
        let found = processor()
            .extract_entities("Signed by Mr. Holmes on 12/01/2023.")
            .await;
        let labels: Vec<&str> = found.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["PERSON", "DATE"]);
    }

    #[test]
    fn test_summary_threshold() {
        let ai = processor();
        let short = "One. Two. Three. Four. Five.";
        assert!(ai.summarize(short).is_none());

        let long = format!("{} Second sentence. Third one. Fourth here.", "A long opening sentence".repeat(30) + ".");
        let summary = ai.summarize(&long).unwrap();
        assert!(summary.ends_with("Third one."));
        assert!(!summary.contains("Fourth"));
    }
}
