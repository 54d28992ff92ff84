//! External rewrite adapter: one whole-document pass through a generative
//! completion service.

use crate::preserve::{is_protected, PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};
use crate::text::{word_count, Document};
use crate::types::{Configuration, Tone};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_REWRITE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MIN_MAX_TOKENS: u32 = 500;

pub const SYSTEM_PROMPT: &str = "You are an expert writer who adjusts text style while preserving meaning.";
const TEXT_HEADER: &str = "Text to rewrite:\n";

/// A generative text service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, system: &str, user: &str, temperature: f32, max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for /v1/chat/completions
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, system: &str, user: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context(format!("Failed to send request to completion service at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion request failed with status {}: {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .context("No choices in completion response")
    }
}

type Transform = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Test double: applies a closure to the text section of the prompt.
/// `None` from the closure becomes an error.
pub struct MockCompletionClient {
    transform: Arc<Transform>,
    calls: AtomicUsize,
}

impl MockCompletionClient {
    pub fn new(transform: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            transform: Arc::new(transform),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the text unchanged
    pub fn echo() -> Self {
        Self::new(|text| Some(text.to_string()))
    }

    /// Always returns `reply`
    pub fn replying(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Some(reply.clone()))
    }

    /// Always errors
    pub fn failing() -> Self {
        Self::new(|_| None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, _system: &str, user: &str, _temperature: f32, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = user.rsplit_once(TEXT_HEADER).map(|(_, t)| t).unwrap_or(user);
        (self.transform)(text).context("mock completion failure")
    }
}

/// The configuration dials rendered as natural-language descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionProfile {
    pub tone: Tone,
    pub formality: f64,
    pub formality_desc: &'static str,
    pub burstiness_desc: &'static str,
    pub vocabulary_desc: &'static str,
    pub perplexity_target: u32,
    pub idiom_desc: &'static str,
    pub conciseness_desc: &'static str,
    pub temperature: f32,
    pub max_output_length: Option<usize>,
}

fn band(value: f64, low: &'static str, mid: &'static str, high: &'static str) -> &'static str {
    if value < 0.3 {
        low
    } else if value < 0.7 {
        mid
    } else {
        high
    }
}

impl InstructionProfile {
    pub fn from_config(cfg: &Configuration) -> Self {
        let vocabulary_desc = match cfg.perplexity_target {
            0..=39 => "simple",
            40..=69 => "moderate",
            _ => "complex",
        };
        Self {
            tone: cfg.tone,
            formality: cfg.formality,
            formality_desc: band(cfg.formality, "very casual", "moderate", "formal"),
            burstiness_desc: band(cfg.burstiness, "low variation", "moderate variation", "high variation"),
            vocabulary_desc,
            perplexity_target: cfg.perplexity_target,
            idiom_desc: band(cfg.idiom_density, "minimal", "moderate", "frequent"),
            conciseness_desc: band(cfg.conciseness, "elaborate", "balanced", "concise"),
            temperature: cfg.temperature as f32,
            max_output_length: cfg.max_output_length,
        }
    }

    /// User prompt for `text`
    pub fn render(&self, text: &str) -> String {
        format!(
            "Rewrite the following text with these specific characteristics:\n\
             - Tone: {}\n\
             - Formality: {} (level {:.1})\n\
             - Sentence variation (burstiness): {} - mix short and long sentences\n\
             - Vocabulary complexity (perplexity target: {}/100): {}\n\
             - Idiom usage: {} idioms and colloquialisms\n\
             - Conciseness: {}\n\n\
             Important: Maintain the core meaning while adjusting these parameters naturally. \
             Keep every marker of the form {}S0{} exactly as it appears.\n\n\
             {}{}",
            self.tone,
            self.formality_desc,
            self.formality,
            self.burstiness_desc,
            self.perplexity_target,
            self.vocabulary_desc,
            self.idiom_desc,
            self.conciseness_desc,
            PLACEHOLDER_OPEN,
            PLACEHOLDER_CLOSE,
            TEXT_HEADER,
            text
        )
    }

    pub fn max_tokens(&self, text: &str) -> u32 {
        match self.max_output_length {
            Some(limit) => limit.min(u32::MAX as usize) as u32,
            None => ((word_count(text) * 2) as u32).max(MIN_MAX_TOKENS),
        }
    }
}

fn shield_marker(index: usize) -> String {
    format!("{}S{}{}", PLACEHOLDER_OPEN, index, PLACEHOLDER_CLOSE)
}

/// Swap each protected sentence for a marker; returns the shielded text and
/// the (marker, sentence) pairs
pub fn shield(text: &str) -> (String, Vec<(String, String)>) {
    let mut doc = Document::parse(text);
    let mut shielded = Vec::new();
    for sentence in doc.sentences_mut() {
        if is_protected(sentence) {
            let marker = shield_marker(shielded.len());
            shielded.push((marker.clone(), std::mem::replace(sentence, marker)));
        }
    }
    (doc.render(), shielded)
}

/// Splice protected sentences back; `None` if any marker went missing
pub fn unshield(text: &str, shielded: &[(String, String)]) -> Option<String> {
    let mut restored = text.to_string();
    for (marker, sentence) in shielded {
        if !restored.contains(marker.as_str()) {
            return None;
        }
        restored = restored.replacen(marker.as_str(), sentence, 1);
    }
    Some(restored)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten(String),
    /// Service error, timeout or empty response; the input stands
    Failed,
    /// A protected-sentence marker was dropped by the service
    MarkersLost,
}

/// Drives one rewrite attempt with a deadline
#[derive(Clone)]
pub struct RewriteAdapter {
    client: Arc<dyn CompletionClient>,
    timeout: Duration,
}

impl RewriteAdapter {
    pub fn new(client: Arc<dyn CompletionClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn rewrite(&self, text: &str, profile: &InstructionProfile) -> RewriteOutcome {
        let (shielded_text, shielded) = shield(text);
        let prompt = profile.render(&shielded_text);
        let max_tokens = profile.max_tokens(&shielded_text);

        debug!(
            "Calling '{}' ({} protected sentences shielded, max_tokens {})",
            self.client.name(),
            shielded.len(),
            max_tokens
        );

        let call = self.client.complete(SYSTEM_PROMPT, &prompt, profile.temperature, max_tokens);
        let reply = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Rewrite via '{}' failed: {:#}", self.client.name(), e);
                return RewriteOutcome::Failed;
            }
            Err(_) => {
                warn!("Rewrite via '{}' timed out after {:?}", self.client.name(), self.timeout);
                return RewriteOutcome::Failed;
            }
        };

        let reply = reply.trim();
        if reply.is_empty() {
            warn!("Rewrite via '{}' returned an empty response", self.client.name());
            return RewriteOutcome::Failed;
        }

        match unshield(reply, &shielded) {
            Some(rewritten) => {
                info!("Rewrite produced {} words from {}", word_count(&rewritten), word_count(text));
                RewriteOutcome::Rewritten(rewritten)
            }
            None => {
                warn!("Rewrite dropped a protected-sentence marker; discarding");
                RewriteOutcome::MarkersLost
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preserve::placeholder;
    use crate::types::SpanKind;

    fn adapter(client: MockCompletionClient) -> RewriteAdapter {
        RewriteAdapter::new(Arc::new(client), Duration::from_secs(5))
    }

    #[test]
    fn test_profile_descriptors() {
        let cfg = Configuration {
            formality: 0.1,
            burstiness: 0.8,
            idiom_density: 0.5,
            conciseness: 0.9,
            perplexity_target: 75,
            ..Configuration::default()
        };
        let profile = InstructionProfile::from_config(&cfg);
        assert_eq!(profile.formality_desc, "very casual");
        assert_eq!(profile.burstiness_desc, "high variation");
        assert_eq!(profile.idiom_desc, "moderate");
        assert_eq!(profile.conciseness_desc, "concise");
        assert_eq!(profile.vocabulary_desc, "complex");
        let prompt = profile.render("Hello there.");
        assert!(prompt.contains("- Tone: neutral"));
        assert!(prompt.ends_with("Text to rewrite:\nHello there."));
    }

    #[test]
    fn test_max_tokens() {
        let mut profile = InstructionProfile::from_config(&Configuration::default());
        assert_eq!(profile.max_tokens("a few words"), 500);
        let long = vec!["word"; 400].join(" ");
        assert_eq!(profile.max_tokens(&long), 800);
        profile.max_output_length = Some(120);
        assert_eq!(profile.max_tokens(&long), 120);
    }

    #[test]
    fn test_shield_round_trip() {
        let tagged = format!("Plain first. Cited {} here. Plain last.", placeholder(SpanKind::Citation, 0));
        let (shielded, pairs) = shield(&tagged);
        assert_eq!(pairs.len(), 1);
        assert!(!shielded.contains(&placeholder(SpanKind::Citation, 0)));
        assert_eq!(unshield(&shielded, &pairs).unwrap(), tagged);
        assert!(unshield("Plain first. Plain last.", &pairs).is_none());
    }

    #[tokio::test]
    async fn test_rewrite_success() {
        let outcome = adapter(MockCompletionClient::new(|t| Some(t.replace("big", "large"))))
            .rewrite("A big idea.", &InstructionProfile::from_config(&Configuration::default()))
            .await;
        assert_eq!(outcome, RewriteOutcome::Rewritten("A large idea.".to_string()));
    }

    #[tokio::test]
    async fn test_rewrite_failure_and_empty() {
        let profile = InstructionProfile::from_config(&Configuration::default());
        assert_eq!(adapter(MockCompletionClient::failing()).rewrite("Text.", &profile).await, RewriteOutcome::Failed);
        assert_eq!(adapter(MockCompletionClient::replying("   ")).rewrite("Text.", &profile).await, RewriteOutcome::Failed);
    }

    #[tokio::test]
    async fn test_rewrite_dropping_marker_is_rejected() {
        let profile = InstructionProfile::from_config(&Configuration::default());
        let tagged = format!("Intro line. Quote {} stays. Outro line.", placeholder(SpanKind::Quote, 0));
        let outcome = adapter(MockCompletionClient::replying("Everything replaced.")).rewrite(&tagged, &profile).await;
        assert_eq!(outcome, RewriteOutcome::MarkersLost);
    }

    struct SlowClient;

    #[async_trait]
    impl CompletionClient for SlowClient {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn complete(&self, _s: &str, user: &str, _t: f32, _m: u32) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(user.to_string())
        }
    }

    #[tokio::test]
    async fn test_rewrite_timeout() {
        let adapter = RewriteAdapter::new(Arc::new(SlowClient), Duration::from_millis(50));
        let profile = InstructionProfile::from_config(&Configuration::default());
        assert_eq!(adapter.rewrite("Text.", &profile).await, RewriteOutcome::Failed);
    }

    #[tokio::test]
    #[ignore] // Requires a running completion service
    async fn test_openai_client_integration() {
        let client = OpenAiClient::new("http://127.0.0.1:8000", None, DEFAULT_MODEL);
        let reply = client.complete(SYSTEM_PROMPT, "Say hi.", 0.7, 16).await;
        assert!(reply.is_ok());
    }
}
