//! Keyword rules for document type.

use crate::models::{Classification, DocumentType};

/// Checked in order; the first rule with any keyword present wins.
const RULES: &[(DocumentType, &[&str], f32)] = &[
    (
        DocumentType::Invoice,
        &["invoice", "bill", "total", "amount due"],
        0.90,
    ),
    (
        DocumentType::Contract,
        &["contract", "agreement", "terms and conditions"],
        0.85,
    ),
    (
        DocumentType::Resume,
        &["resume", "cv", "experience", "education"],
        0.80,
    ),
    (
        DocumentType::Receipt,
        &["receipt", "payment", "thank you for your purchase"],
        0.85,
    ),
];

/// Labels the model may choose from when no rule matches
pub const MODEL_LABELS: &[DocumentType] = &[
    DocumentType::Invoice,
    DocumentType::Contract,
    DocumentType::Resume,
    DocumentType::Report,
    DocumentType::Receipt,
    DocumentType::Form,
    DocumentType::Other,
];

/// Result for the model-less path and for model failures
pub const FALLBACK: Classification = Classification {
    document_type: DocumentType::Other,
    confidence: 0.5,
};

/// Classification of blank text
pub const EMPTY: Classification = Classification {
    document_type: DocumentType::Unknown,
    confidence: 0.0,
};

/// Apply the keyword table. Substring match on lower-cased text.
pub fn classify_by_keywords(text: &str) -> Option<Classification> {
    let lower = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(document_type, _, confidence)| Classification {
            document_type: *document_type,
            confidence: *confidence,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(text: &str) -> Option<DocumentType> {
        classify_by_keywords(text).map(|c| c.document_type)
    }

    #[test]
    fn test_each_rule() {
        assert_eq!(kind("INVOICE #4471"), Some(DocumentType::Invoice));
        assert_eq!(kind("This Agreement is made"), Some(DocumentType::Contract));
        assert_eq!(kind("Education: BSc Physics"), Some(DocumentType::Resume));
        assert_eq!(kind("Payment received"), Some(DocumentType::Receipt));
        assert_eq!(kind("Quarterly weather notes"), None);
    }

    #[test]
    fn test_priority_order() {
        // Invoice keywords beat contract keywords
        let c = classify_by_keywords("Contract summary. Total: $500").unwrap();
        assert_eq!(c.document_type, DocumentType::Invoice);
        assert_eq!(c.confidence, 0.90);

        // Contract beats resume
        let c = classify_by_keywords("Employment agreement requiring 5 years experience").unwrap();
        assert_eq!(c.document_type, DocumentType::Contract);
        assert_eq!(c.confidence, 0.85);

        // Resume beats receipt
        assert_eq!(
            kind("Payment history and education"),
            Some(DocumentType::Resume)
        );
    }

    #[test]
    fn test_substring_matching() {
        // "billing" contains "bill"
        assert_eq!(kind("billing address"), Some(DocumentType::Invoice));
    }
}
