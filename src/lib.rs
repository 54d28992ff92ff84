//! Humanizer - prose rewriting pipeline
//!
//! Rewrites machine-sounding prose through ordered passes with:
//! - Citation and quotation preservation
//! - Rule-driven phrase substitution, restructuring and lexical variety
//! - Tone-aware style injection
//! - Optional external rewrite behind a semantic drift guard
//! - Before/after metrics and an optional zero-width watermark

pub mod changes;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod metrics;
pub mod patterns;
pub mod pipeline;
pub mod preserve;
pub mod profile;
pub mod restructure;
pub mod rewrite;
pub mod rng;
pub mod similarity;
pub mod style;
pub mod text;
pub mod types;
pub mod watermark;

pub use types::*;
pub use config::{EngineSettings, ServiceEndpoints};
pub use error::{HumanizeError, Result};
pub use lexicon::{HttpLexicon, LexicalResource, StaticLexicon};
pub use metrics::MetricsPolicy;
pub use pipeline::{CancelFlag, Humanizer, PassObserver, SharedHumanizer, TracingObserver};
pub use profile::{analyze_style, StyleAnalysis};
pub use rewrite::{CompletionClient, MockCompletionClient, OpenAiClient};
pub use similarity::{FixedSimilarity, HttpEmbeddingSimilarity, JaccardSimilarity, SimilarityModel};
pub use watermark::WatermarkVerdict;
