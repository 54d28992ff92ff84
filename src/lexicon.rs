//! Lexical diversification: vary repeated content words using a curated
//! thesaurus and an optional external lexical-relations service.

use crate::preserve::is_protected;
use crate::rng;
use crate::text::{match_case, Document};
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Words must be longer than this to be counted or replaced
const MIN_WORD_LEN: usize = 3;
/// Tier-3 candidates within this many characters of the original are preferred
const LENGTH_TOLERANCE: usize = 3;
/// Only the first few candidates of an external lookup are considered
const EXTERNAL_SHORTLIST: usize = 3;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+(?:['’]\p{L}+)*").unwrap());

const WORD_GROUPS: &[(&str, &[&str])] = &[
    ("analyze", &["examine", "study", "investigate", "explore", "review", "assess"]),
    ("important", &["crucial", "vital", "significant", "essential", "key", "critical"]),
    ("shows", &["demonstrates", "reveals", "indicates", "displays", "exhibits"]),
    ("understand", &["comprehend", "grasp", "realize", "recognize", "appreciate"]),
    ("develop", &["create", "build", "establish", "form", "generate", "produce"]),
    ("improve", &["enhance", "better", "upgrade", "refine", "advance", "boost"]),
    ("consider", &["think about", "examine", "evaluate", "contemplate", "ponder"]),
    ("different", &["various", "diverse", "distinct", "separate", "alternative"]),
    ("effective", &["successful", "efficient", "productive", "powerful", "useful"]),
    ("significant", &["important", "substantial", "considerable", "notable", "major"]),
    ("implement", &["apply", "execute", "carry out", "put into practice", "deploy"]),
    ("utilize", &["use", "employ", "apply", "harness", "leverage"]),
    ("comprehensive", &["complete", "thorough", "extensive", "detailed", "full"]),
    ("fundamental", &["basic", "essential", "core", "primary", "key", "central"]),
    ("substantial", &["significant", "considerable", "large", "major", "extensive"]),
    ("results", &["findings", "outcomes", "effects", "conclusions"]),
    ("method", &["approach", "technique", "procedure", "way"]),
    ("problem", &["issue", "difficulty", "challenge", "snag"]),
    ("increase", &["rise", "growth", "jump", "gain"]),
    ("large", &["big", "sizable", "hefty", "major"]),
    ("quickly", &["rapidly", "fast", "swiftly", "promptly"]),
    ("research", &["study", "inquiry", "investigation", "work"]),
    ("system", &["setup", "framework", "structure", "arrangement"]),
    ("process", &["procedure", "routine", "workflow", "operation"]),
];

/// Reverse map: every listed synonym points back at its base word and siblings
static REVERSE_GROUPS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut reverse: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for (base, synonyms) in WORD_GROUPS {
        for &synonym in synonyms.iter() {
            let entry = reverse.entry(synonym).or_default();
            entry.push(*base);
            entry.extend(synonyms.iter().copied().filter(|s| *s != synonym));
        }
    }
    reverse
});

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "because", "been", "before", "being",
    "below", "between", "both", "could", "does", "doing", "down", "during", "each", "from",
    "further", "have", "having", "here", "hers", "herself", "himself", "into", "itself", "just",
    "more", "most", "myself", "once", "only", "other", "ours", "ourselves", "over", "same",
    "should", "some", "such", "than", "that", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "under", "until", "very", "were",
    "what", "when", "where", "which", "while", "whom", "will", "with", "would", "your", "yours",
    "yourself", "yourselves",
];

/// Synonym lookups resolved before any random draw, keyed by case-folded word
pub type ExternalSynonyms = BTreeMap<String, Vec<String>>;

/// A lexical-relations service
#[async_trait]
pub trait LexicalResource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn synonyms(&self, word: &str) -> Result<Vec<String>>;
}

/// In-memory resource; used offline and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticLexicon {
    entries: HashMap<String, Vec<String>>,
}

impl StaticLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, word: &str, synonyms: &[&str]) -> Self {
        self.entries
            .insert(word.to_lowercase(), synonyms.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[async_trait]
impl LexicalResource for StaticLexicon {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn synonyms(&self, word: &str) -> Result<Vec<String>> {
        Ok(self.entries.get(&word.to_lowercase()).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct SynonymResponse {
    synonyms: Vec<String>,
}

/// HTTP lexical service: `GET {base}/synonyms?word=...` → `{"synonyms": [...]}`
#[derive(Debug, Clone)]
pub struct HttpLexicon {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLexicon {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LexicalResource for HttpLexicon {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn synonyms(&self, word: &str) -> Result<Vec<String>> {
        let url = format!("{}/synonyms?word={}", self.base_url, urlencoding::encode(word));
        debug!("Fetching synonyms from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("Failed to reach lexical service at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Lexical service error {}: {}", status, body);
        }

        let parsed: SynonymResponse = response
            .json()
            .await
            .context("Failed to parse lexical service response")?;
        Ok(parsed.synonyms)
    }
}

fn is_eligible(word: &str) -> bool {
    word.chars().count() > MIN_WORD_LEN && word.chars().all(|c| c.is_alphabetic())
}

fn is_stop_word(folded: &str) -> bool {
    STOP_WORDS.contains(&folded)
}

/// Tiers 1 and 2: curated groups, then the reverse map
pub fn curated_synonyms(folded: &str) -> Option<Vec<&'static str>> {
    if let Some((_, synonyms)) = WORD_GROUPS.iter().find(|(base, _)| *base == folded) {
        return Some(synonyms.to_vec());
    }
    REVERSE_GROUPS.get(folded).cloned()
}

/// Case-folded counts of eligible words across unprotected sentences
pub fn word_frequencies(doc: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for sentence in doc.sentences().filter(|s| !is_protected(s)) {
        for m in WORD.find_iter(sentence) {
            if is_eligible(m.as_str()) {
                *counts.entry(m.as_str().to_lowercase()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Ask the external resource about every repeated word the curated tables do
/// not cover. Lookups finish before any random draw; a failed lookup counts
/// as "no synonyms".
pub async fn resolve_external(text: &str, resource: &dyn LexicalResource) -> ExternalSynonyms {
    let doc = Document::parse(text);
    let wanted: Vec<String> = word_frequencies(&doc)
        .into_iter()
        .filter(|(word, count)| *count > 1 && !is_stop_word(word) && curated_synonyms(word).is_none())
        .map(|(word, _)| word)
        .collect();

    let lookups = wanted.iter().map(|word| resource.synonyms(word));
    let results = futures::future::join_all(lookups).await;

    let mut resolved = ExternalSynonyms::new();
    for (word, result) in wanted.into_iter().zip(results) {
        match result {
            Ok(candidates) => {
                resolved.insert(word, candidates);
            }
            Err(e) => warn!("Lexical resource '{}' failed for '{}': {:#}", resource.name(), word, e),
        }
    }
    debug!("Resolved {} external synonym entries", resolved.len());
    resolved
}

fn external_candidates<'a>(original: &str, candidates: &'a [String]) -> Vec<&'a str> {
    let folded = original.to_lowercase();
    let usable: Vec<&str> = candidates
        .iter()
        .map(|s| s.as_str())
        .filter(|s| s.to_lowercase() != folded && s.chars().count() > 2)
        .collect();
    let len = original.chars().count();
    let close: Vec<&str> = usable
        .iter()
        .copied()
        .filter(|s| s.chars().count().abs_diff(len) <= LENGTH_TOLERANCE)
        .collect();
    let pool = if close.is_empty() { usable } else { close };
    pool.into_iter().take(EXTERNAL_SHORTLIST).collect()
}

fn choose_synonym<R: Rng + ?Sized>(word: &str, external: &ExternalSynonyms, rng: &mut R) -> Option<String> {
    let folded = word.to_lowercase();
    if let Some(candidates) = curated_synonyms(&folded) {
        return rng::pick(rng, &candidates).map(|s| match_case(word, s));
    }
    let candidates = external_candidates(word, external.get(&folded)?);
    rng::pick(rng, &candidates).map(|s| match_case(word, s))
}

/// Replace repeated words. An occurrence is eligible while its word's
/// remaining count is above one; each successful substitution decrements it.
pub fn diversify<R: Rng + ?Sized>(
    text: &str,
    replace_probability: f64,
    external: &ExternalSynonyms,
    rng: &mut R,
) -> String {
    let mut doc = Document::parse(text);
    let mut remaining = word_frequencies(&doc);

    for sentence in doc.sentences_mut() {
        if is_protected(sentence) {
            continue;
        }

        let mut edits: Vec<(usize, usize, String)> = Vec::new();
        for m in WORD.find_iter(sentence) {
            let word = m.as_str();
            if !is_eligible(word) {
                continue;
            }
            let folded = word.to_lowercase();
            if is_stop_word(&folded) || remaining.get(&folded).copied().unwrap_or(0) <= 1 {
                continue;
            }
            if !rng::chance(rng, replace_probability) {
                continue;
            }
            if let Some(replacement) = choose_synonym(word, external, rng) {
                edits.push((m.start(), m.end(), replacement));
                if let Some(count) = remaining.get_mut(&folded) {
                    *count -= 1;
                }
            }
        }

        for (start, end, replacement) in edits.into_iter().rev() {
            sentence.replace_range(start..end, &replacement);
        }
    }

    doc.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn test_curated_tiers() {
        assert!(curated_synonyms("analyze").unwrap().contains(&"examine"));
        // reverse lookup: "crucial" is listed under "important"
        let reverse = curated_synonyms("crucial").unwrap();
        assert!(reverse.contains(&"important"));
        assert!(!reverse.contains(&"crucial"));
        assert!(curated_synonyms("zebra").is_none());
    }

    #[test]
    fn test_single_occurrences_untouched() {
        let mut rng = seeded(Some(1));
        let text = "The important method works. Another different idea follows.";
        assert_eq!(diversify(text, 1.0, &ExternalSynonyms::new(), &mut rng), text);
    }

    #[test]
    fn test_repeated_word_varied_once() {
        let mut rng = seeded(Some(1));
        let text = "This result is important. That step is important too.";
        let out = diversify(text, 1.0, &ExternalSynonyms::new(), &mut rng);
        // two occurrences: the first is replaced, then the count drops to one
        assert_eq!(out.matches("important").count(), 1, "got {out}");
    }

    #[test]
    fn test_stop_words_and_short_words_skipped() {
        let mut rng = seeded(Some(2));
        let text = "They said that they knew that. The cat sat. The cat ran.";
        assert_eq!(diversify(text, 1.0, &ExternalSynonyms::new(), &mut rng), text);
    }

    #[test]
    fn test_capitalization_kept() {
        let mut rng = seeded(Some(5));
        let text = "Analyze the data. Then analyze it again.";
        let out = diversify(text, 1.0, &ExternalSynonyms::new(), &mut rng);
        assert!(out.starts_with(char::is_uppercase));
        assert!(!out.starts_with("Analyze"), "got {out}");
    }

    #[test]
    fn test_external_candidates_prefer_similar_length() {
        let candidates = vec!["zebra".to_string(), "extraordinarily".to_string(), "horse".to_string()];
        let picked = external_candidates("mount", &candidates);
        assert_eq!(picked, vec!["zebra", "horse"]);
    }

    #[tokio::test]
    async fn test_resolve_external_with_static_lexicon() {
        let lexicon = StaticLexicon::new().with("garden", &["yard", "plot"]);
        let text = "The garden grew. The garden died.";
        let external = resolve_external(text, &lexicon).await;
        assert_eq!(external.get("garden").unwrap(), &vec!["yard".to_string(), "plot".to_string()]);

        let mut rng = seeded(Some(3));
        let out = diversify(text, 1.0, &external, &mut rng);
        assert!(out.contains("Yard") || out.contains("yard") || out.contains("plot"), "got {out}");
    }

    #[test]
    fn test_protected_sentences_skipped() {
        let mut rng = seeded(Some(4));
        let text = format!("Results are important {}C0{}. Results are important.", '\u{E000}', '\u{E001}');
        let out = diversify(&text, 1.0, &ExternalSynonyms::new(), &mut rng);
        // only one unprotected occurrence of each word, nothing is eligible
        assert_eq!(out, text);
    }

    #[tokio::test]
    #[ignore] // Requires a running lexical service
    async fn test_http_lexicon_integration() {
        let lexicon = HttpLexicon::new("http://127.0.0.1:8090");
        let result = lexicon.synonyms("happy").await;
        assert!(result.is_ok());
    }
}
