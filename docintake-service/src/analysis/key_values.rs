//! Structured fields pulled from invoices, receipts and forms.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("date", r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}"),
        (
            "total",
            r"(?:total|amount due|balance)[:\s]*[\$€£]?\s*[\d,]+\.?\d*",
        ),
        ("invoice_number", r"(?:invoice|inv)\.?\s*#?\s*[A-Z0-9\-]+"),
        ("tax", r"(?:tax|vat|gst)[:\s]*[\$€£]?\s*[\d,]+\.?\d*"),
    ]
    .into_iter()
    .map(|(key, pattern)| {
        let regex = Regex::new(&format!("(?i){}", pattern)).expect("valid key-value pattern");
        (key, regex)
    })
    .collect()
});

/// Match every pattern against `text`. For each key the last match wins;
/// keys without a match are absent.
pub fn extract_key_value_pairs(text: &str) -> BTreeMap<String, String> {
    PATTERNS
        .iter()
        .filter_map(|(key, regex)| {
            regex
                .find_iter(text)
                .last()
                .map(|m| (key.to_string(), m.as_str().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_fields() {
        let text = "ACME Corp\nInvoice # INV-2024-001\nDate: 03/15/2024\nSubtotal: $100.00\nTax: $8.25\nTotal: $108.25";
        let kv = extract_key_value_pairs(text);

        assert_eq!(kv.get("date").map(String::as_str), Some("03/15/2024"));
        assert_eq!(kv.get("tax").map(String::as_str), Some("Tax: $8.25"));
        assert_eq!(kv.get("total").map(String::as_str), Some("Total: $108.25"));
        assert_eq!(
            kv.get("invoice_number").map(String::as_str),
            Some("Invoice # INV-2024-001")
        );
    }

    #[test]
    fn test_last_match_wins() {
        let text = "Balance: 10.00 carried. Amount due 250.75";
        let kv = extract_key_value_pairs(text);
        assert_eq!(kv.get("total").map(String::as_str), Some("Amount due 250.75"));
    }

    #[test]
    fn test_missing_keys_absent() {
        let kv = extract_key_value_pairs("nothing structured here");
        assert!(kv.is_empty());
    }
}
