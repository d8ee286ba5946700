//! Named entity taggers.
//!
//! The pattern tagger recognizes well-formed spans (dates, money,
//! percentages, emails, phone numbers, companies with a legal suffix and
//! people with an honorific). The model tagger hands a short prefix of
//! the text to a language model and locates the returned spans.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::models::Entity;

/// Characters of input examined by the pattern tagger
pub const PATTERN_WINDOW_CHARS: usize = 10_000;

/// Characters of input examined by the model tagger
pub const MODEL_WINDOW_CHARS: usize = 512;

const PATTERN_CONFIDENCE: f32 = 0.9;

const MONTHS: &str = "Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?";

/// Label and pattern, in precedence order for overlapping spans
static ENTITY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    let date = format!(
        r"\b(?:\d{{4}}-\d{{2}}-\d{{2}}|\d{{1,2}}[/-]\d{{1,2}}[/-]\d{{2,4}}|(?:{m})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}|\d{{1,2}}\s+(?:{m})\.?\s+\d{{4}})\b",
        m = MONTHS
    );

    [
        (
            "EMAIL",
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b".to_string(),
        ),
        ("DATE", date),
        (
            "MONEY",
            r"[\$€£]\s?\d{1,3}(?:,\d{3})*(?:\.\d+)?|[\$€£]\s?\d+(?:\.\d+)?|\b\d+(?:\.\d{2})?\s?(?:USD|EUR|GBP|dollars|euros)\b"
                .to_string(),
        ),
        ("PERCENT", r"\b\d+(?:\.\d+)?\s?(?:%|percent\b)".to_string()),
        (
            "PHONE",
            r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)\s?|\b\d{3}[\s.-])\d{3}[\s.-]\d{4}\b".to_string(),
        ),
        (
            "ORG",
            r"\b(?:[A-Z][\w&'-]*\s+){0,3}[A-Z][\w&'-]*,?\s+(?:Inc|LLC|Ltd|Corp|Corporation|GmbH|PLC|LLP|Co)\b\.?"
                .to_string(),
        ),
        (
            "PERSON",
            r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?".to_string(),
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(&pattern).expect("valid entity pattern")))
    .collect()
});

/// Prefix of `text` holding at most `max_chars` characters
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn char_offset(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].chars().count()
}

/// Tag the first 10,000 characters with the pattern table.
///
/// A span overlapping one claimed by an earlier label is dropped.
/// Results are ordered by position.
pub fn pattern_entities(text: &str) -> Vec<Entity> {
    let window = char_prefix(text, PATTERN_WINDOW_CHARS);

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut spans: Vec<(usize, usize, &'static str)> = Vec::new();

    for (label, regex) in ENTITY_PATTERNS.iter() {
        for m in regex.find_iter(window) {
            let (start, end) = (m.start(), m.end());
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            claimed.push((start, end));
            spans.push((start, end, *label));
        }
    }

    spans.sort_by_key(|&(start, _, _)| start);
    spans
        .into_iter()
        .map(|(start, end, label)| Entity {
            text: window[start..end].to_string(),
            label: label.to_string(),
            start: char_offset(window, start),
            end: char_offset(window, end),
            confidence: PATTERN_CONFIDENCE,
        })
        .collect()
}

/// One span as returned by the model
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntity {
    pub text: String,
    #[serde(rename = "type", alias = "label", alias = "entity_group")]
    pub label: String,
    #[serde(default = "default_score", alias = "confidence")]
    pub score: f32,
}

fn default_score() -> f32 {
    0.5
}

/// Reply shape requested from the model tagger
#[derive(Debug, Deserialize)]
pub struct ModelEntityReply {
    #[serde(default)]
    pub entities: Vec<ModelEntity>,
}

/// Labels the model tagger may emit
pub const MODEL_LABELS: &[&str] = &["PER", "ORG", "LOC", "MISC"];

/// Locate model spans in the analysed window.
///
/// Repeated spans are matched left to right. Spans that do not occur in
/// the window, or carry an unknown label, are dropped.
pub fn resolve_model_entities(window: &str, found: Vec<ModelEntity>) -> Vec<Entity> {
    let mut entities = Vec::new();
    let mut cursor = 0usize;

    for item in found {
        let needle = item.text.trim();
        let label = item.label.trim().to_uppercase();
        let label = label.strip_prefix("B-").or_else(|| label.strip_prefix("I-")).unwrap_or(&label);
        if needle.is_empty() || !MODEL_LABELS.contains(&label) {
            continue;
        }

        let byte_start = window[cursor..]
            .find(needle)
            .map(|i| i + cursor)
            .or_else(|| window.find(needle));
        let Some(byte_start) = byte_start else {
            continue;
        };
        let byte_end = byte_start + needle.len();
        cursor = byte_end;

        entities.push(Entity {
            text: needle.to_string(),
            label: label.to_string(),
            start: char_offset(window, byte_start),
            end: char_offset(window, byte_end),
            confidence: item.score.clamp(0.0, 1.0),
        });
    }

    entities
}
