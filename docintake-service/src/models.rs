//! Document records and extraction result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use strum::{Display, EnumString};

/// Processing status for documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Stored, not yet picked up by a processing run
    Pending,
    /// A processing run is in progress
    Processing,
    /// The last processing run completed successfully
    Completed,
    /// The last processing run failed; see `metadata.error`
    Failed,
}

/// Inferred document category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentType {
    Invoice,
    Contract,
    Resume,
    Report,
    Receipt,
    Form,
    Other,
    /// Classification of empty text
    Unknown,
}

impl DocumentType {
    /// Types that carry structured fields worth pulling out as key-value pairs
    pub fn has_key_values(&self) -> bool {
        matches!(
            self,
            DocumentType::Invoice | DocumentType::Receipt | DocumentType::Form
        )
    }
}

/// Document record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub filename: String,
    #[serde(skip)]
    pub file_path: PathBuf,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
    pub processing_status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a freshly uploaded, not yet processed document
    pub fn new(filename: &str, file_path: PathBuf, file_size: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            file_path,
            file_size,
            upload_date: Utc::now(),
            processing_status: ProcessingStatus::Pending,
            document_type: None,
            page_count: None,
            metadata: serde_json::Map::new(),
        }
    }
}

/// Which pipeline steps to run for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOptions {
    #[serde(default = "default_true")]
    pub extract_text: bool,
    #[serde(default)]
    pub perform_ocr: bool,
    #[serde(default)]
    pub extract_entities: bool,
    #[serde(default)]
    pub classify_document: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            extract_text: true,
            perform_ocr: false,
            extract_entities: false,
            classify_document: false,
        }
    }
}

impl ExtractionOptions {
    /// Derive options from batch operation names.
    ///
    /// Unknown names are ignored.
    pub fn from_operations<S: AsRef<str>>(operations: &[S]) -> Self {
        let mut options = Self {
            extract_text: false,
            ..Self::default()
        };
        for op in operations {
            match op.as_ref() {
                "extract" | "extract_text" => options.extract_text = true,
                "ocr" | "perform_ocr" => options.perform_ocr = true,
                "classify" | "classify_document" => options.classify_document = true,
                "entities" | "extract_entities" => options.extract_entities = true,
                other => tracing::debug!(operation = %other, "Ignoring unknown batch operation"),
            }
        }
        options
    }
}

fn default_true() -> bool {
    true
}

/// A tagged span of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub label: String,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
    pub confidence: f32,
}

/// Text of one PDF page, 1-based page numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// Result of a classification call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub confidence: f32,
}

/// Output of one processing run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub text_content: Option<String>,
    pub entities: Option<Vec<Entity>>,
    pub document_type: Option<DocumentType>,
    pub confidence: Option<f32>,
    pub pages: Vec<PageText>,
    pub key_value_pairs: BTreeMap<String, String>,
    pub summary: Option<String>,
    /// Elapsed wall time in seconds
    pub processing_time: f64,
}

impl ExtractionResult {
    pub fn empty(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            text_content: None,
            entities: None,
            document_type: None,
            confidence: None,
            pages: Vec::new(),
            key_value_pairs: BTreeMap::new(),
            summary: None,
            processing_time: 0.0,
        }
    }

    /// Text content, treating `None` as empty
    pub fn text(&self) -> &str {
        self.text_content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_document_type_labels() {
        assert_eq!(DocumentType::Invoice.to_string(), "invoice");
        assert_eq!(DocumentType::from_str("Receipt").unwrap(), DocumentType::Receipt);
        assert_eq!(DocumentType::from_str("FORM").unwrap(), DocumentType::Form);
        assert!(DocumentType::from_str("POSITIVE").is_err());
    }

    #[test]
    fn test_key_value_types() {
        assert!(DocumentType::Invoice.has_key_values());
        assert!(DocumentType::Receipt.has_key_values());
        assert!(DocumentType::Form.has_key_values());
        assert!(!DocumentType::Contract.has_key_values());
        assert!(!DocumentType::Other.has_key_values());
    }

    #[test]
    fn test_options_from_operations() {
        let options = ExtractionOptions::from_operations(&["extract", "classify"]);
        assert!(options.extract_text);
        assert!(options.classify_document);
        assert!(!options.perform_ocr);
        assert!(!options.extract_entities);

        let options = ExtractionOptions::from_operations(&["ocr", "entities", "bogus"]);
        assert!(!options.extract_text);
        assert!(options.perform_ocr);
        assert!(options.extract_entities);
    }

    #[test]
    fn test_document_serialization_hides_path() {
        let doc = Document::new("a.txt", PathBuf::from("/secret/uploads/a.txt"), 3);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("file_path").is_none());
        assert_eq!(json["processing_status"], "pending");
        assert_eq!(json["filename"], "a.txt");
        assert!(json.get("document_type").is_none());
    }

    #[test]
    fn test_entity_label_serializes_as_type() {
        let entity = Entity {
            text: "ACME Corp".to_string(),
            label: "ORG".to_string(),
            start: 0,
            end: 9,
            confidence: 0.9,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "ORG");
    }
}
