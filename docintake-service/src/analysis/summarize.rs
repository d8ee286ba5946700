//! Extractive summaries: the leading sentences of the text.

/// Split on `.`, `!` or `?` followed by whitespace or end of text.
/// Runs of terminators stay with their sentence; trailing text without
/// a terminator is the last sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let next = chars.peek().map(|&(_, n)| n);
        match next {
            Some('.' | '!' | '?') => continue,
            Some(n) if !n.is_whitespace() => continue,
            _ => {}
        }
        let end = idx + c.len_utf8();
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// First `max_sentences` sentences joined with a space, or the input
/// unchanged when it has no more sentences than that.
pub fn summarize(text: &str, max_sentences: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= max_sentences {
        return text.to_string();
    }
    sentences[..max_sentences].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one. Second!  Third?\nFourth without end");
        assert_eq!(
            sentences,
            vec!["First one.", "Second!", "Third?", "Fourth without end"]
        );
    }

    #[test]
    fn test_split_keeps_inner_periods() {
        let sentences = split_sentences("Version 2.5 shipped... Really?! Yes.");
        assert_eq!(sentences, vec!["Version 2.5 shipped...", "Really?!", "Yes."]);
    }

    #[test]
    fn test_summary_unchanged_at_threshold() {
        let text = "One.  Two.\n\nThree.";
        assert_eq!(summarize(text, 3), text);
    }

    #[test]
    fn test_summary_takes_leading_sentences() {
        let text = "One. Two.\nThree! Four? Five.";
        assert_eq!(summarize(text, 3), "One. Two. Three!");
    }
}
