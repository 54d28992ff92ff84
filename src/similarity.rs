//! Semantic similarity models and the drift guard built on them

use crate::text::word_tokens;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default acceptance threshold for drift-guarded passes
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.7;
const JACCARD_FLOOR: f64 = 0.7;
const EMPTY_SIMILARITY: f64 = 0.8;

/// Scores how close two texts are in meaning, in [0, 1]
#[async_trait]
pub trait SimilarityModel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn similarity(&self, a: &str, b: &str) -> Result<f64>;
}

/// Token-set overlap with a floor. Always available.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<String> = word_tokens(a).into_iter().collect();
    let right: HashSet<String> = word_tokens(b).into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return EMPTY_SIMILARITY;
    }
    let intersection = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    (intersection / union).max(JACCARD_FLOOR)
}

/// Cosine similarity of two embeddings; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardSimilarity;

#[async_trait]
impl SimilarityModel for JaccardSimilarity {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        Ok(jaccard(a, b))
    }
}

/// Always returns the same score; for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedSimilarity(pub f64);

#[async_trait]
impl SimilarityModel for FixedSimilarity {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn similarity(&self, _a: &str, _b: &str) -> Result<f64> {
        Ok(self.0)
    }
}

/// Request body for /v1/embeddings
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 2],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Cosine similarity over an OpenAI-compatible embeddings endpoint
#[derive(Clone)]
pub struct HttpEmbeddingSimilarity {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl HttpEmbeddingSimilarity {
    pub fn new(base_url: &str, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SimilarityModel for HttpEmbeddingSimilarity {
    fn name(&self) -> &'static str {
        "http_embedding"
    }

    async fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: [a, b],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context(format!("Failed to send request to embedding service at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding request failed with status {}: {}", status, body);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        match parsed.data.as_slice() {
            [first, second, ..] => Ok(cosine_similarity(&first.embedding, &second.embedding).clamp(0.0, 1.0) as f64),
            _ => anyhow::bail!("Embedding response held {} vectors, expected 2", parsed.data.len()),
        }
    }
}

/// Outcome of one drift check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCheck {
    pub similarity: f64,
    pub accepted: bool,
}

/// Rejects pass output that strays too far from the pass input
#[derive(Clone)]
pub struct DriftGuard {
    model: Arc<dyn SimilarityModel>,
    threshold: f64,
}

impl DriftGuard {
    pub fn new(model: Arc<dyn SimilarityModel>, threshold: f64) -> Self {
        Self { model, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity from the configured model, or Jaccard if the model fails
    pub async fn similarity(&self, before: &str, after: &str) -> f64 {
        match self.model.similarity(before, after).await {
            Ok(score) if score.is_finite() => score,
            Ok(score) => {
                warn!("Similarity model '{}' returned {}; using jaccard", self.model.name(), score);
                jaccard(before, after)
            }
            Err(e) => {
                warn!("Similarity model '{}' failed: {:#}; using jaccard", self.model.name(), e);
                jaccard(before, after)
            }
        }
    }

    pub async fn check(&self, before: &str, after: &str) -> DriftCheck {
        let similarity = self.similarity(before, after).await;
        let accepted = similarity >= self.threshold;
        debug!("Drift check: similarity {:.3} (threshold {:.2})", similarity, self.threshold);
        DriftCheck { similarity, accepted }
    }

    /// False iff similarity falls below the threshold
    pub async fn accept(&self, before: &str, after: &str) -> bool {
        self.check(before, after).await.accepted
    }
}

impl Default for DriftGuard {
    fn default() -> Self {
        Self::new(Arc::new(JaccardSimilarity), DEFAULT_DRIFT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingModel;

    #[async_trait]
    impl SimilarityModel for FailingModel {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn similarity(&self, _a: &str, _b: &str) -> Result<f64> {
            anyhow::bail!("offline")
        }
    }

    #[test]
    fn test_jaccard_floor_and_empty() {
        assert_eq!(jaccard("", "anything"), 0.8);
        assert_eq!(jaccard("alpha beta", "gamma delta"), 0.7);
        assert_eq!(jaccard("Same words here", "same WORDS here"), 1.0);
    }

    #[test]
    fn test_cosine() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_drift_guard_threshold() {
        let low = DriftGuard::new(Arc::new(FixedSimilarity(0.69)), 0.7);
        let edge = DriftGuard::new(Arc::new(FixedSimilarity(0.7)), 0.7);
        assert!(!low.accept("a", "b").await);
        assert!(edge.accept("a", "b").await);
    }

    #[tokio::test]
    async fn test_drift_guard_monotone_in_similarity() {
        let mut last = true;
        for score in [1.0, 0.9, 0.75, 0.7, 0.65, 0.3, 0.0] {
            let guard = DriftGuard::new(Arc::new(FixedSimilarity(score)), 0.7);
            let accepted = guard.accept("x", "y").await;
            // once rejected, lower scores stay rejected
            assert!(last || !accepted);
            last = accepted;
        }
    }

    #[tokio::test]
    async fn test_failing_model_falls_back_to_jaccard() {
        let guard = DriftGuard::new(Arc::new(FailingModel), 0.7);
        let check = guard.check("one two", "three four").await;
        assert_eq!(check.similarity, 0.7);
        assert!(check.accepted);
    }

    #[tokio::test]
    #[ignore] // Requires a running embedding service
    async fn test_http_embedding_integration() {
        let model = HttpEmbeddingSimilarity::new("http://127.0.0.1:8000", "all-MiniLM-L6-v2");
        let score = model.similarity("a cat sat", "a cat was sitting").await;
        assert!(score.is_ok());
    }
}
