//! Tokenization and casing helpers shared by every pass
//!
//! Two tokenizations live here:
//! - `Document` is sentence-aware (paragraphs → sentences) and drives the
//!   restructuring/style passes.
//! - `word_tokens` is a flat, case-folded word stream used by the estimators.
//! Lexical diversity uses plain `split_whitespace` (see `metrics`).

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static WORD_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'’]*").unwrap());

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "al", "approx", "cf", "dr", "e.g", "eg", "esp", "etc", "fig", "i.e", "ie", "jr", "mr", "mrs",
    "ms", "no", "prof", "sr", "st", "vs", "vol",
];

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']'];

/// Paragraphs of sentences. Rendering joins sentences with a single space and
/// paragraphs with a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub paragraphs: Vec<Vec<String>>,
}

impl Document {
    pub fn parse(text: &str) -> Self {
        let paragraphs = PARAGRAPH_BREAK
            .split(text)
            .map(split_sentences)
            .filter(|p| !p.is_empty())
            .collect();
        Self { paragraphs }
    }

    pub fn render(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.join(" "))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn sentence_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.len()).sum()
    }

    pub fn sentences(&self) -> impl Iterator<Item = &String> {
        self.paragraphs.iter().flatten()
    }

    pub fn sentences_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.paragraphs.iter_mut().flatten()
    }
}

/// Sentence-aware split of a single paragraph.
///
/// A boundary is a run of `.`/`!`/`?` (plus closing quotes/brackets) followed
/// by whitespace, where the next visible character is not lowercase and the
/// word before the period is not a known abbreviation or single initial.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (_, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            i += 1;
            continue;
        }

        let term_pos = i;
        let mut j = i + 1;
        while j < chars.len() && (matches!(chars[j].1, '.' | '!' | '?') || CLOSERS.contains(&chars[j].1)) {
            j += 1;
        }

        let end_byte = chars.get(j).map(|(b, _)| *b).unwrap_or(text.len());
        let at_end = j >= chars.len();
        let followed_by_space = !at_end && chars[j].1.is_whitespace();

        if at_end {
            break;
        }
        if !followed_by_space {
            i = j;
            continue;
        }

        let mut k = j;
        while k < chars.len() && chars[k].1.is_whitespace() {
            k += 1;
        }
        let next_lower = chars.get(k).map(|(_, ch)| ch.is_lowercase()).unwrap_or(false);

        let is_abbrev = c == '.' && j == term_pos + 1 && {
            let before = &text[start..chars[term_pos].0];
            let last = before
                .rsplit(|ch: char| ch.is_whitespace() || ch == '(')
                .next()
                .unwrap_or("")
                .to_lowercase();
            ABBREVIATIONS.contains(&last.as_str())
                || (last.chars().count() == 1 && last.chars().all(|ch| ch.is_alphabetic()))
        };

        if !next_lower && !is_abbrev {
            let sentence = text[start..end_byte].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = chars.get(k).map(|(b, _)| *b).unwrap_or(text.len());
        }
        i = k.max(j);
    }

    let tail = text[start.min(text.len())..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Case-folded word tokens (letters/digits with inner apostrophes)
pub fn word_tokens(text: &str) -> Vec<String> {
    WORD_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Upper-case the first character
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character unless the first word must stay capitalized
/// ("I", "I'm", acronyms, placeholders).
pub fn lowercase_first(s: &str) -> String {
    let first_word = s.split_whitespace().next().unwrap_or("");
    let bare: String = first_word.chars().filter(|c| c.is_alphanumeric()).collect();
    let keep = bare == "I"
        || first_word.starts_with("I'")
        || first_word.starts_with("I’")
        || (bare.chars().count() > 1 && bare.chars().all(|c| !c.is_lowercase()))
        || !s.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false);
    if keep {
        return s.to_string();
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Carry the case of `template`'s first character onto `replacement`
pub fn match_case(template: &str, replacement: &str) -> String {
    match template.chars().next() {
        Some(c) if c.is_uppercase() => capitalize_first(replacement),
        _ => replacement.to_string(),
    }
}

/// Split a trailing run of sentence punctuation off a sentence
pub fn split_terminal(sentence: &str) -> (&str, &str) {
    let trimmed = sentence.trim_end();
    let body = trimmed.trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'));
    (body, &trimmed[body.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let s = split_sentences("First one. Second one! Third?");
        assert_eq!(s, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn test_split_abbreviation_and_lowercase() {
        let s = split_sentences("See Dr. Smith for details. It works, e.g. here. done now.");
        assert_eq!(s, vec!["See Dr. Smith for details.", "It works, e.g. here. done now."]);
    }

    #[test]
    fn test_split_closing_quote() {
        let s = split_sentences("He said \"stop.\" Then he left.");
        assert_eq!(s, vec!["He said \"stop.\"", "Then he left."]);
    }

    #[test]
    fn test_split_no_terminator() {
        assert_eq!(split_sentences("no terminator here"), vec!["no terminator here"]);
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_document_paragraphs_roundtrip() {
        let doc = Document::parse("One. Two.\n\nThree.");
        assert_eq!(doc.paragraphs.len(), 2);
        assert_eq!(doc.sentence_count(), 3);
        assert_eq!(doc.render(), "One. Two.\n\nThree.");
    }

    #[test]
    fn test_word_tokens() {
        assert_eq!(word_tokens("Don't STOP, it's 2020!"), vec!["don't", "stop", "it's", "2020"]);
    }

    #[test]
    fn test_casing_helpers() {
        assert_eq!(capitalize_first("hello"), "Hello");
        assert_eq!(lowercase_first("The cat"), "the cat");
        assert_eq!(lowercase_first("I think so"), "I think so");
        assert_eq!(lowercase_first("NASA said"), "NASA said");
        assert_eq!(match_case("Moreover", "also"), "Also");
        assert_eq!(match_case("moreover", "also"), "also");
    }

    #[test]
    fn test_split_terminal() {
        assert_eq!(split_terminal("Done here?!"), ("Done here", "?!"));
        assert_eq!(split_terminal("No end"), ("No end", ""));
    }
}
