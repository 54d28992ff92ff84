//! Span preservation: lift citations and quotations out of the text before
//! any pass runs, and put them back afterwards.
//!
//! Placeholders are `\u{E000}` + kind letter + per-kind index + `\u{E001}`.
//! Both delimiters are private-use code points, so a placeholder can never
//! collide with natural-language text, and it contains no whitespace or
//! sentence punctuation, so it stays a single word inside a single sentence.

use crate::types::{PreservedSpan, SpanKind};
use once_cell::sync::Lazy;
use regex::Regex;

pub const PLACEHOLDER_OPEN: char = '\u{E000}';
pub const PLACEHOLDER_CLOSE: char = '\u{E001}';

static CITATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // (Smith, 2020), (see Jones 1999, p. 4)
        Regex::new(r"\([^()]*\d{4}[^()]*\)").unwrap(),
        // [12], [3, 4], [Ref 7]
        Regex::new(r"\[[^\[\]]*\d+[^\[\]]*\]").unwrap(),
        // Smith et al. (2020), Van Dyke et al. (1999)
        Regex::new(r"\b(?:[A-Z][a-z]+ )+et al\.\s*\(\d{4}\)").unwrap(),
    ]
});

// Straight single quotes are scanned by `single_quoted` instead
static QUOTE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#""[^"\n]+""#).unwrap(),
        Regex::new(r"“[^”\n]+”").unwrap(),
        Regex::new(r"‘[^’\n]+’").unwrap(),
        Regex::new(r"`[^`\n]+`").unwrap(),
    ]
});

fn opens_quote(prev: Option<char>, next: Option<char>) -> bool {
    let after_boundary = matches!(prev, None | Some('(' | '[')) || prev.map_or(false, char::is_whitespace);
    after_boundary && next.map_or(false, |c| !c.is_whitespace() && c != '\'')
}

fn closes_quote(prev: Option<char>, next: Option<char>) -> bool {
    prev.map_or(false, |c| !c.is_whitespace())
        && next.map_or(true, |c| c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']'))
}

/// Byte ranges of `'...'` quotations. The opening quote follows whitespace,
/// a bracket or the start of the text; the closing quote is followed by
/// whitespace, punctuation or the end. Apostrophes inside words (`it's`,
/// `don't`) are neither.
fn single_quoted(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let at = |i: usize| chars.get(i).map(|(_, c)| *c);
    let before = |i: usize| if i == 0 { None } else { at(i - 1) };

    let mut found = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].1 != '\'' || !opens_quote(before(i), at(i + 1)) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        let mut close = None;
        while j < chars.len() && chars[j].1 != '\n' {
            if chars[j].1 == '\'' && closes_quote(before(j), at(j + 1)) {
                close = Some(j);
                break;
            }
            j += 1;
        }
        match close {
            Some(j) => {
                found.push((chars[i].0, chars[j].0 + 1));
                i = j + 1;
            }
            None => i += 1,
        }
    }
    found
}

pub fn placeholder(kind: SpanKind, index: usize) -> String {
    let tag = match kind {
        SpanKind::Citation => 'C',
        SpanKind::Quote => 'Q',
    };
    format!("{}{}{}{}", PLACEHOLDER_OPEN, tag, index, PLACEHOLDER_CLOSE)
}

/// True if the sentence holds any placeholder and must not be transformed
pub fn is_protected(sentence: &str) -> bool {
    sentence.contains(PLACEHOLDER_OPEN)
}

/// Every placeholder token present in `text`, in order of appearance
pub fn placeholders_in(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[open..];
        match after.find(PLACEHOLDER_CLOSE) {
            Some(close) => {
                let end = close + PLACEHOLDER_CLOSE.len_utf8();
                found.push(after[..end].to_string());
                rest = &after[end..];
            }
            None => break,
        }
    }
    found
}

/// Find citation/quote spans in `text` and swap them for placeholders.
///
/// Returns the tagged text and the spans in extraction order (citations
/// first, then quotes, each in left-to-right scan order). Replacement itself
/// runs longest literal first so a quote containing a citation is lifted as
/// a whole.
pub fn extract(text: &str, preserve_citations: bool, preserve_quotes: bool) -> (String, Vec<PreservedSpan>) {
    let mut spans: Vec<PreservedSpan> = Vec::new();

    if preserve_citations {
        let mut index = 0;
        for pattern in CITATION_PATTERNS.iter() {
            for m in pattern.find_iter(text) {
                push_span(&mut spans, SpanKind::Citation, &mut index, m.as_str(), m.start(), m.end());
            }
        }
    }

    if preserve_quotes {
        let mut index = 0;
        for pattern in QUOTE_PATTERNS.iter() {
            for m in pattern.find_iter(text) {
                push_span(&mut spans, SpanKind::Quote, &mut index, m.as_str(), m.start(), m.end());
            }
        }
        for (start, end) in single_quoted(text) {
            push_span(&mut spans, SpanKind::Quote, &mut index, &text[start..end], start, end);
        }
    }

    let mut order: Vec<usize> = (0..spans.len()).collect();
    // Longest first; ties keep extraction order
    order.sort_by(|&a, &b| spans[b].original_text.len().cmp(&spans[a].original_text.len()).then(a.cmp(&b)));

    let mut tagged = text.to_string();
    for idx in order {
        let span = &spans[idx];
        if tagged.contains(&span.original_text) {
            tagged = tagged.replace(&span.original_text, &span.placeholder);
        }
    }

    (tagged, spans)
}

fn push_span(spans: &mut Vec<PreservedSpan>, kind: SpanKind, index: &mut usize, literal: &str, start: usize, end: usize) {
    // Repeated identical spans share one placeholder (replacement is global)
    if spans.iter().any(|s| s.original_text == literal) {
        return;
    }
    spans.push(PreservedSpan {
        kind,
        original_text: literal.to_string(),
        start_offset: start,
        end_offset: end,
        placeholder: placeholder(kind, *index),
    });
    *index += 1;
}

/// Put the original spans back, reversing extraction order. A placeholder
/// that a pass removed is skipped silently.
pub fn restore(tagged: &str, spans: &[PreservedSpan]) -> String {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| spans[b].original_text.len().cmp(&spans[a].original_text.len()).then(a.cmp(&b)));

    let mut restored = tagged.to_string();
    for idx in order.into_iter().rev() {
        let span = &spans[idx];
        if restored.contains(&span.placeholder) {
            restored = restored.replace(&span.placeholder, &span.original_text);
        }
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_extracted_and_restored() {
        let text = "It is important to note that researchers (Smith, 2020) found significant results.";
        let (tagged, spans) = extract(text, true, true);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Citation);
        assert_eq!(spans[0].original_text, "(Smith, 2020)");
        assert!(!tagged.contains("Smith"));
        assert!(is_protected(&tagged));
        assert_eq!(restore(&tagged, &spans), text);
    }

    #[test]
    fn test_nested_quote_containing_citation() {
        let text = "She wrote \"as shown before (Lee, 2019) it holds\" and moved on.";
        let (tagged, spans) = extract(text, true, true);
        assert_eq!(spans.len(), 2);
        // Only the quote placeholder survives in the tagged text
        assert_eq!(placeholders_in(&tagged), vec![placeholder(SpanKind::Quote, 0)]);
        assert_eq!(restore(&tagged, &spans), text);
    }

    #[test]
    fn test_et_al_and_brackets() {
        let text = "Brown et al. (2018) argued this [12]. Later work [12] agreed.";
        let (tagged, spans) = extract(text, true, false);
        assert!(spans.iter().any(|s| s.original_text == "Brown et al. (2018)"));
        assert!(spans.iter().any(|s| s.original_text == "[12]"));
        assert!(!tagged.contains("[12]"));
        assert_eq!(restore(&tagged, &spans), text);
    }

    #[test]
    fn test_apostrophes_are_not_quotes() {
        let text = "It's clear we don't know. He said 'maybe later' and left.";
        let (_, spans) = extract(text, false, true);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].original_text, "'maybe later'");
    }

    #[test]
    fn test_adjacent_single_quotes_and_inner_apostrophes() {
        let text = "He answered 'yes' 'no' and 'it's fine' later.";
        let (tagged, spans) = extract(text, false, true);
        let literals: Vec<&str> = spans.iter().map(|s| s.original_text.as_str()).collect();
        assert_eq!(literals, vec!["'yes'", "'no'", "'it's fine'"]);
        assert!(!tagged.contains('\''));
        assert_eq!(restore(&tagged, &spans), text);
    }

    #[test]
    fn test_single_quote_at_edges_and_in_brackets() {
        let text = "'Start' here (and 'inside') end 'done'";
        let (_, spans) = extract(text, false, true);
        let literals: Vec<&str> = spans.iter().map(|s| s.original_text.as_str()).collect();
        assert_eq!(literals, vec!["'Start'", "'inside'", "'done'"]);
    }

    #[test]
    fn test_flags_disable_extraction() {
        let text = "Quoted \"words\" and (Doe, 2001).";
        let (tagged, spans) = extract(text, false, false);
        assert!(spans.is_empty());
        assert_eq!(tagged, text);
    }

    #[test]
    fn test_missing_placeholder_is_noop() {
        let text = "A claim (Doe, 2001). Another sentence.";
        let (_, spans) = extract(text, true, true);
        let restored = restore("Another sentence.", &spans);
        assert_eq!(restored, "Another sentence.");
    }

    #[test]
    fn test_curly_and_backtick_quotes() {
        let text = "He said “hello there” and typed `ls -la` twice.";
        let (tagged, spans) = extract(text, true, true);
        assert_eq!(spans.len(), 2);
        assert_eq!(placeholders_in(&tagged).len(), 2);
        assert_eq!(restore(&tagged, &spans), text);
    }
}
