//! Core type definitions for the humanization pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Target voice. Unknown strings fall back to `Neutral`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tone {
    #[default]
    Neutral,
    Casual,
    Formal,
    Persuasive,
    Academic,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Neutral => "neutral",
            Tone::Casual => "casual",
            Tone::Formal => "formal",
            Tone::Persuasive => "persuasive",
            Tone::Academic => "academic",
        }
    }
}

impl From<String> for Tone {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "casual" => Tone::Casual,
            "formal" => Tone::Formal,
            "persuasive" => Tone::Persuasive,
            "academic" => Tone::Academic,
            _ => Tone::Neutral,
        }
    }
}

impl From<Tone> for String {
    fn from(t: Tone) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Academic` watermarks the final text
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntegrityMode {
    #[default]
    Editor,
    Academic,
}

impl From<String> for IntegrityMode {
    fn from(s: String) -> Self {
        if s.trim().eq_ignore_ascii_case("academic") {
            IntegrityMode::Academic
        } else {
            IntegrityMode::Editor
        }
    }
}

impl From<IntegrityMode> for String {
    fn from(m: IntegrityMode) -> Self {
        match m {
            IntegrityMode::Editor => "editor".to_string(),
            IntegrityMode::Academic => "academic".to_string(),
        }
    }
}

/// Stylistic dials for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub tone: Tone,
    pub formality: f64,
    pub burstiness: f64,
    pub idiom_density: f64,
    pub conciseness: f64,
    pub temperature: f64,
    pub perplexity_target: u32,
    pub random_seed: Option<u64>,
    pub preserve_citations: bool,
    pub preserve_quotes: bool,
    pub integrity_mode: IntegrityMode,
    pub max_output_length: Option<usize>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            tone: Tone::Neutral,
            formality: 0.5,
            burstiness: 0.5,
            idiom_density: 0.3,
            conciseness: 0.5,
            temperature: 0.7,
            perplexity_target: 50,
            random_seed: None,
            preserve_citations: true,
            preserve_quotes: true,
            integrity_mode: IntegrityMode::Editor,
            max_output_length: None,
        }
    }
}

impl Configuration {
    /// Clamp every ratio to [0,1] and the perplexity target to [1,100].
    /// Non-finite ratios take the default value.
    pub fn normalized(mut self) -> Self {
        let d = Configuration::default();
        self.formality = clamp_ratio(self.formality, d.formality);
        self.burstiness = clamp_ratio(self.burstiness, d.burstiness);
        self.idiom_density = clamp_ratio(self.idiom_density, d.idiom_density);
        self.conciseness = clamp_ratio(self.conciseness, d.conciseness);
        self.temperature = clamp_ratio(self.temperature, d.temperature);
        self.perplexity_target = self.perplexity_target.clamp(1, 100);
        self
    }

    pub fn intensity(&self) -> Intensity {
        Intensity::from_formality(self.formality)
    }
}

fn clamp_ratio(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Partial configuration: a stored style profile, or the fields a caller set
/// explicitly. `None` means "not specified".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub tone: Option<Tone>,
    pub formality: Option<f64>,
    pub burstiness: Option<f64>,
    pub idiom_density: Option<f64>,
    pub conciseness: Option<f64>,
    pub temperature: Option<f64>,
    pub perplexity_target: Option<u32>,
    pub random_seed: Option<u64>,
    pub preserve_citations: Option<bool>,
    pub preserve_quotes: Option<bool>,
    pub integrity_mode: Option<IntegrityMode>,
    pub max_output_length: Option<usize>,
}

/// How hard the rule-driven passes push, derived from formality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Light,
    Standard,
    Heavy,
}

impl Intensity {
    pub fn from_formality(formality: f64) -> Self {
        if formality < 0.3 {
            Intensity::Heavy
        } else if formality < 0.6 {
            Intensity::Standard
        } else {
            Intensity::Light
        }
    }

    pub fn pattern_probability(&self) -> f64 {
        match self {
            Intensity::Light => 0.7,
            Intensity::Standard => 0.85,
            Intensity::Heavy => 0.95,
        }
    }

    pub fn restructure_probability(&self) -> f64 {
        match self {
            Intensity::Light => 0.3,
            Intensity::Standard => 0.5,
            Intensity::Heavy => 0.7,
        }
    }

    pub fn synonym_probability(&self) -> f64 {
        match self {
            Intensity::Light => 0.2,
            Intensity::Standard => 0.35,
            Intensity::Heavy => 0.5,
        }
    }

    pub fn contraction_probability(&self) -> f64 {
        match self {
            Intensity::Light => 0.4,
            Intensity::Standard => 0.6,
            Intensity::Heavy => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Citation,
    Quote,
}

/// A citation or quotation lifted out of the text before any pass runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreservedSpan {
    pub kind: SpanKind,
    pub original_text: String,
    pub start_offset: usize, // byte offsets into the original text
    pub end_offset: usize,
    #[serde(skip)]
    pub placeholder: String,
}

/// Pass identifiers, dispatched by `Humanizer::run_pass`
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    ExternalRewrite,
    PatternSubstitution,
    Restructure,
    LexicalDiversity,
    StyleInjection,
    HumanQuirks,
    Polish,
}

impl PassKind {
    pub fn name(&self) -> &'static str {
        match self {
            PassKind::ExternalRewrite => "external_rewrite",
            PassKind::PatternSubstitution => "pattern_substitution",
            PassKind::Restructure => "restructure",
            PassKind::LexicalDiversity => "lexical_diversity",
            PassKind::StyleInjection => "style_injection",
            PassKind::HumanQuirks => "human_quirks",
            PassKind::Polish => "polish",
        }
    }

    /// Default execution order
    pub fn ordered() -> Vec<PassKind> {
        vec![
            PassKind::ExternalRewrite,
            PassKind::PatternSubstitution,
            PassKind::Restructure,
            PassKind::LexicalDiversity,
            PassKind::StyleInjection,
            PassKind::HumanQuirks,
            PassKind::Polish,
        ]
    }

    /// Passes whose output goes through the drift guard
    pub fn is_drift_guarded(&self) -> bool {
        matches!(self, PassKind::ExternalRewrite | PassKind::Restructure)
    }
}

/// One entry of the pass log
#[derive(Debug, Clone, Serialize)]
pub struct PassRecord {
    pub name: PassKind,
    pub before: String,
    pub after: String,
    pub accepted: bool,
    pub similarity: Option<f64>,
}

/// Working text plus the pass log; lives for one run
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub text: String,
    pub passes: Vec<PassRecord>,
}

impl PipelineState {
    pub fn new(text: String) -> Self {
        Self { text, passes: Vec::new() }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTag {
    LengthChanged,
    VocabularyVaried,
    ContractionsAdded,
    ContractionsRemoved,
    EllipsisAdded,
    DashesAdded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub position: usize,
    pub original: String,
    pub rewritten: String,
    pub tags: BTreeSet<ChangeTag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub flesch_kincaid_original: f64,
    pub flesch_kincaid_humanized: f64,
    pub burstiness_original: f64,
    pub burstiness_humanized: f64,
    pub avg_sentence_length_original: f64,
    pub avg_sentence_length_humanized: f64,
    pub lexical_diversity_original: f64,
    pub lexical_diversity_humanized: f64,
    pub perplexity: f64,
    pub readability: f64,
    pub ai_detection_probability: f64,
    pub human_score: f64,
}

/// Watermark derived from a text's SHA-256
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Watermark {
    pub hash_prefix: String,
    pub bitstring: String,
    pub embedding_stride: usize,
}

/// Result of one `humanize` call
#[derive(Debug, Clone, Serialize)]
pub struct HumanizeResponse {
    pub text: String,
    pub changes: Vec<ChangeRecord>,
    pub metrics: MetricsSnapshot,
    pub passes: Vec<PassRecord>,
    pub watermark: Option<Watermark>,
}

/// Returned for empty or whitespace-only input
pub const EMPTY_INPUT_SENTINEL: &str = "No text supplied.";

impl HumanizeResponse {
    pub fn sentinel() -> Self {
        Self {
            text: EMPTY_INPUT_SENTINEL.to_string(),
            changes: Vec::new(),
            metrics: MetricsSnapshot::default(),
            passes: Vec::new(),
            watermark: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.text == EMPTY_INPUT_SENTINEL && self.passes.is_empty()
    }
}
