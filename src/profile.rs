//! Style profiles: analyzing a writing sample and merging stored profiles
//! into request configuration

use crate::metrics::{count_contractions, flesch_kincaid_grade, flesch_reading_ease, lexical_diversity};
use crate::text::Document;
use crate::types::{ConfigOverrides, Configuration};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static PASSIVE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:is|are|was|were|be|been|being)\s+(?:\w+ed|shown|seen|made|done|taken|given|found|written|known|built)\b")
        .unwrap()
});

const LONG_WORD_CHARS: usize = 8;

impl Configuration {
    /// Field-by-field merge: request beats profile, profile beats default
    pub fn resolve(request: &ConfigOverrides, profile: Option<&ConfigOverrides>) -> Configuration {
        let empty = ConfigOverrides::default();
        let profile = profile.unwrap_or(&empty);
        let d = Configuration::default();

        Configuration {
            tone: request.tone.or(profile.tone).unwrap_or(d.tone),
            formality: request.formality.or(profile.formality).unwrap_or(d.formality),
            burstiness: request.burstiness.or(profile.burstiness).unwrap_or(d.burstiness),
            idiom_density: request.idiom_density.or(profile.idiom_density).unwrap_or(d.idiom_density),
            conciseness: request.conciseness.or(profile.conciseness).unwrap_or(d.conciseness),
            temperature: request.temperature.or(profile.temperature).unwrap_or(d.temperature),
            perplexity_target: request
                .perplexity_target
                .or(profile.perplexity_target)
                .unwrap_or(d.perplexity_target),
            random_seed: request.random_seed.or(profile.random_seed),
            preserve_citations: request
                .preserve_citations
                .or(profile.preserve_citations)
                .unwrap_or(d.preserve_citations),
            preserve_quotes: request.preserve_quotes.or(profile.preserve_quotes).unwrap_or(d.preserve_quotes),
            integrity_mode: request.integrity_mode.or(profile.integrity_mode).unwrap_or(d.integrity_mode),
            max_output_length: request.max_output_length.or(profile.max_output_length),
        }
        .normalized()
    }
}

/// Measurements taken from a writing sample
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleAnalysis {
    pub avg_sentence_length: f64,
    pub sentence_length_std_dev: f64,
    pub lexical_diversity: f64,
    pub flesch_kincaid_grade: f64,
    pub reading_ease: f64,
    pub passive_voice_ratio: f64,
    pub contraction_count: usize,
    pub long_word_ratio: f64,
}

pub fn analyze_style(text: &str) -> StyleAnalysis {
    let doc = Document::parse(text);
    let lengths: Vec<f64> = doc.sentences().map(|s| s.split_whitespace().count() as f64).collect();
    if lengths.is_empty() {
        return StyleAnalysis::default();
    }

    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    let passive = doc.sentences().filter(|s| PASSIVE_CLAUSE.is_match(s)).count();

    let words: Vec<&str> = text.split_whitespace().collect();
    let long_words = words
        .iter()
        .filter(|w| w.chars().filter(|c| c.is_alphanumeric()).count() > LONG_WORD_CHARS)
        .count();

    StyleAnalysis {
        avg_sentence_length: mean,
        sentence_length_std_dev: variance.sqrt(),
        lexical_diversity: lexical_diversity(text),
        flesch_kincaid_grade: flesch_kincaid_grade(text),
        reading_ease: flesch_reading_ease(text),
        passive_voice_ratio: passive as f64 / n,
        contraction_count: count_contractions(text),
        long_word_ratio: if words.is_empty() { 0.0 } else { long_words as f64 / words.len() as f64 },
    }
}

impl StyleAnalysis {
    /// Partial configuration a profile store keeps for this sample
    pub fn to_overrides(&self) -> ConfigOverrides {
        // a quarter of long words already reads as fully formal; contractions pull it down
        let contraction_pull = if self.contraction_count > 0 { 0.2 } else { 0.0 };
        let formality = (self.long_word_ratio * 4.0 - contraction_pull).clamp(0.0, 1.0);

        ConfigOverrides {
            formality: Some(formality),
            burstiness: Some((self.sentence_length_std_dev / 20.0).min(1.0)),
            conciseness: Some(1.0 - (self.avg_sentence_length / 30.0).min(1.0)),
            ..ConfigOverrides::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegrityMode, Tone};

    #[test]
    fn test_resolve_precedence() {
        let request = ConfigOverrides {
            formality: Some(0.9),
            ..Default::default()
        };
        let profile = ConfigOverrides {
            formality: Some(0.1),
            tone: Some(Tone::Casual),
            integrity_mode: Some(IntegrityMode::Academic),
            ..Default::default()
        };
        let cfg = Configuration::resolve(&request, Some(&profile));
        assert_eq!(cfg.formality, 0.9);
        assert_eq!(cfg.tone, Tone::Casual);
        assert_eq!(cfg.integrity_mode, IntegrityMode::Academic);
        assert_eq!(cfg.burstiness, 0.5);
    }

    #[test]
    fn test_resolve_without_profile_is_default() {
        let cfg = Configuration::resolve(&ConfigOverrides::default(), None);
        assert_eq!(cfg, Configuration::default());
    }

    #[test]
    fn test_resolve_clamps() {
        let request = ConfigOverrides {
            conciseness: Some(-3.0),
            perplexity_target: Some(500),
            ..Default::default()
        };
        let cfg = Configuration::resolve(&request, None);
        assert_eq!(cfg.conciseness, 0.0);
        assert_eq!(cfg.perplexity_target, 100);
    }

    #[test]
    fn test_analyze_style() {
        let sample = "The results were analyzed by the committee. We can't wait. \
                      Extraordinarily comprehensive documentation accompanies everything.";
        let analysis = analyze_style(sample);
        assert!((analysis.avg_sentence_length - 5.0).abs() < 1e-9);
        assert!(analysis.sentence_length_std_dev > 0.0);
        assert!((analysis.passive_voice_ratio - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(analysis.contraction_count, 1);
        assert!(analysis.long_word_ratio > 0.2);
    }

    #[test]
    fn test_empty_sample() {
        assert_eq!(analyze_style("   "), StyleAnalysis::default());
    }

    #[test]
    fn test_to_overrides_ranges() {
        let overrides = analyze_style("Short one. Another short sentence here. Yes.").to_overrides();
        for value in [overrides.formality, overrides.burstiness, overrides.conciseness] {
            let v = value.unwrap();
            assert!((0.0..=1.0).contains(&v));
        }
        assert!(overrides.tone.is_none());
    }
}
