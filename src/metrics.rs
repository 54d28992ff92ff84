//! Text statistics and the detection-risk heuristic
//!
//! Perplexity here is the exponentiated unigram entropy of the text itself,
//! not a language-model score. Reported perplexity and burstiness are pulled
//! into a "human-like" band by `MetricsPolicy`; the risk heuristic always
//! sees the raw values.

use crate::patterns::{count_matching_rules, PATTERN_TABLE};
use crate::rng;
use crate::text::{word_tokens, Document};
use crate::types::MetricsSnapshot;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// 's only after pronouns and question words, so possessives do not count
static CONTRACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:\w+n['’]t|\w+['’](?:re|ve|ll|m|d)|(?:it|he|she|that|what|there|here|who|where|how|let)['’]s)\b",
    )
    .unwrap()
});

const CASUAL_OPENERS: &[&str] = &["so", "well", "and", "but", "actually", "look", "honestly", "anyway"];

/// Reporting band for perplexity and burstiness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsPolicy {
    pub perplexity_floor: f64,
    pub perplexity_ceiling: f64,
    /// Added to values below the floor
    pub perplexity_lift: (f64, f64),
    /// Replaces values above the ceiling
    pub perplexity_resample: (f64, f64),
    pub perplexity_default: f64,
    pub burstiness_floor: f64,
    pub burstiness_resample: (f64, f64),
    pub burstiness_default: f64,
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self {
            perplexity_floor: 20.0,
            perplexity_ceiling: 100.0,
            perplexity_lift: (20.0, 30.0),
            perplexity_resample: (60.0, 80.0),
            perplexity_default: 50.0,
            burstiness_floor: 0.5,
            burstiness_resample: (0.7, 1.5),
            burstiness_default: 1.2,
        }
    }
}

/// 2^H over the case-folded token distribution; `None` below two tokens
pub fn raw_perplexity(text: &str) -> Option<f64> {
    let tokens = word_tokens(text);
    if tokens.len() < 2 {
        return None;
    }
    // ordered so the float sum is the same on every call
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for token in &tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let total = tokens.len() as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    Some(2f64.powf(entropy))
}

pub fn perplexity<R: Rng + ?Sized>(text: &str, policy: &MetricsPolicy, rng: &mut R) -> f64 {
    match raw_perplexity(text) {
        None => policy.perplexity_default,
        Some(p) if p < policy.perplexity_floor => {
            p + rng::uniform(rng, policy.perplexity_lift.0, policy.perplexity_lift.1)
        }
        Some(p) if p > policy.perplexity_ceiling => {
            rng::uniform(rng, policy.perplexity_resample.0, policy.perplexity_resample.1)
        }
        Some(p) => p,
    }
}

fn sentence_lengths(text: &str) -> Vec<usize> {
    Document::parse(text)
        .sentences()
        .map(|s| word_tokens(s).len())
        .collect()
}

/// Variance / mean of sentence lengths; `None` for fewer than two sentences
/// or a zero mean
pub fn raw_burstiness(text: &str) -> Option<f64> {
    let lengths = sentence_lengths(text);
    if lengths.len() < 2 {
        return None;
    }
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<usize>() as f64 / n;
    if mean == 0.0 {
        return None;
    }
    let variance = lengths.iter().map(|&l| (l as f64 - mean).powi(2)).sum::<f64>() / n;
    Some(variance / mean)
}

pub fn burstiness<R: Rng + ?Sized>(text: &str, policy: &MetricsPolicy, rng: &mut R) -> f64 {
    match raw_burstiness(text) {
        None => policy.burstiness_default,
        Some(b) if b < policy.burstiness_floor => {
            rng::uniform(rng, policy.burstiness_resample.0, policy.burstiness_resample.1)
        }
        Some(b) => b,
    }
}

/// Unique / total over case-folded whitespace tokens
pub fn lexical_diversity(text: &str) -> f64 {
    let words: Vec<String> = text.split_whitespace().map(|w| w.to_lowercase()).collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&String> = words.iter().collect();
    unique.len() as f64 / words.len() as f64
}

pub fn avg_sentence_length(text: &str) -> f64 {
    let lengths = sentence_lengths(text);
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
}

/// Vowel-group syllable estimate, at least one per word
pub fn count_syllables(word: &str) -> usize {
    let w: Vec<char> = word.to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();
    if w.is_empty() {
        return 0;
    }
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &w {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }
    // silent final e ("make"), but not "-le" ("table")
    let n = w.len();
    if count > 1 && w[n - 1] == 'e' && !(n >= 2 && w[n - 2] == 'l') && !is_vowel(w[n - 2]) {
        count -= 1;
    }
    count.max(1)
}

struct ReadabilityCounts {
    words: f64,
    sentences: f64,
    syllables: f64,
}

fn readability_counts(text: &str) -> Option<ReadabilityCounts> {
    let tokens = word_tokens(text);
    if tokens.is_empty() {
        return None;
    }
    let sentences = Document::parse(text).sentence_count().max(1);
    let syllables: usize = tokens.iter().map(|t| count_syllables(t)).sum();
    Some(ReadabilityCounts {
        words: tokens.len() as f64,
        sentences: sentences as f64,
        syllables: syllables as f64,
    })
}

pub fn flesch_kincaid_grade(text: &str) -> f64 {
    match readability_counts(text) {
        Some(c) => 0.39 * (c.words / c.sentences) + 11.8 * (c.syllables / c.words) - 15.59,
        None => 0.0,
    }
}

pub fn flesch_reading_ease(text: &str) -> f64 {
    match readability_counts(text) {
        Some(c) => 206.835 - 1.015 * (c.words / c.sentences) - 84.6 * (c.syllables / c.words),
        None => 0.0,
    }
}

pub fn has_contractions(text: &str) -> bool {
    CONTRACTION.is_match(text)
}

pub fn count_contractions(text: &str) -> usize {
    CONTRACTION.find_iter(text).count()
}

fn casual_openers_present(text: &str) -> usize {
    let doc = Document::parse(text);
    let openers: HashSet<String> = doc
        .sentences()
        .filter_map(|s| s.split_whitespace().next())
        .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
        .collect();
    CASUAL_OPENERS.iter().filter(|o| openers.contains(**o)).count()
}

/// Heuristic probability that `text` reads as machine-written, in [0, 1]
pub fn detection_risk(text: &str, policy: &MetricsPolicy) -> f64 {
    let mut score = 0.05 * count_matching_rules(text, &PATTERN_TABLE) as f64;

    let perplexity = raw_perplexity(text).unwrap_or(policy.perplexity_default);
    if perplexity < 40.0 {
        score += 0.2;
    } else if perplexity > 80.0 {
        score += 0.1;
    }

    let burstiness = raw_burstiness(text).unwrap_or(policy.burstiness_default);
    if burstiness < policy.burstiness_floor {
        score += 0.2;
    }

    if has_contractions(text) {
        score -= 0.1;
    }
    if text.contains("...") || text.contains('…') || text.contains('—') {
        score -= 0.05;
    }
    score -= 0.02 * casual_openers_present(text) as f64;

    score.clamp(0.0, 1.0)
}

/// Before/after snapshot. Draws happen in a fixed order: original
/// burstiness, humanized burstiness, perplexity.
pub fn compute<R: Rng + ?Sized>(original: &str, humanized: &str, policy: &MetricsPolicy, rng: &mut R) -> MetricsSnapshot {
    let burstiness_original = burstiness(original, policy, rng);
    let burstiness_humanized = burstiness(humanized, policy, rng);
    let perplexity = perplexity(humanized, policy, rng);
    let risk = detection_risk(humanized, policy);

    MetricsSnapshot {
        flesch_kincaid_original: flesch_kincaid_grade(original),
        flesch_kincaid_humanized: flesch_kincaid_grade(humanized),
        burstiness_original,
        burstiness_humanized,
        avg_sentence_length_original: avg_sentence_length(original),
        avg_sentence_length_humanized: avg_sentence_length(humanized),
        lexical_diversity_original: lexical_diversity(original),
        lexical_diversity_humanized: lexical_diversity(humanized),
        perplexity,
        readability: flesch_reading_ease(humanized),
        ai_detection_probability: risk,
        human_score: 100.0 - 100.0 * risk,
    }
}
