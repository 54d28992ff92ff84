//! Humanizer: runs the ordered passes over one document

use crate::changes::diff_changes;
use crate::config::{EngineSettings, ServiceEndpoints};
use crate::error::{HumanizeError, Result};
use crate::lexicon::{self, ExternalSynonyms, HttpLexicon, LexicalResource};
use crate::metrics;
use crate::patterns::{self, PATTERN_TABLE};
use crate::preserve::{self, is_protected};
use crate::restructure::restructure_document;
use crate::rewrite::{CompletionClient, InstructionProfile, OpenAiClient, RewriteAdapter, RewriteOutcome};
use crate::rng::{self, PassRng};
use crate::similarity::{DriftGuard, HttpEmbeddingSimilarity, JaccardSimilarity, SimilarityModel};
use crate::style;
use crate::text::{word_count, Document};
use crate::types::*;
use crate::watermark;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sees every pass record as it is produced
pub trait PassObserver: Send + Sync {
    fn on_pass(&self, record: &PassRecord);
}

/// Default observer: one log line per pass
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PassObserver for TracingObserver {
    fn on_pass(&self, record: &PassRecord) {
        let changed = record.before != record.after;
        match (record.accepted, record.similarity) {
            (false, Some(similarity)) => warn!(
                "Pass '{}' rejected by drift guard (similarity {:.3})",
                record.name.name(),
                similarity
            ),
            (false, None) => warn!("Pass '{}' rejected", record.name.name()),
            (true, Some(similarity)) => info!(
                "Pass '{}' accepted (changed: {}, similarity {:.3})",
                record.name.name(),
                changed,
                similarity
            ),
            (true, None) => debug!("Pass '{}' done (changed: {})", record.name.name(), changed),
        }
    }
}

/// Caller-held switch checked between passes
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Main humanization engine (thread-safe via Arc)
pub struct Humanizer {
    pub settings: EngineSettings,
    pub rewrite: Option<RewriteAdapter>,
    pub lexicon: Option<Arc<dyn LexicalResource>>,
    pub drift_guard: DriftGuard,
    pub observer: Arc<dyn PassObserver>,
}

pub type SharedHumanizer = Arc<Humanizer>;

fn record(name: PassKind, before: &str, after: String, accepted: bool, similarity: Option<f64>) -> PassRecord {
    PassRecord {
        name,
        before: before.to_string(),
        after,
        accepted,
        similarity,
    }
}

impl Humanizer {
    /// Create a humanizer with optional collaborators. A missing similarity
    /// model falls back to Jaccard overlap.
    pub fn new(
        settings: EngineSettings,
        rewrite_client: Option<Arc<dyn CompletionClient>>,
        lexicon: Option<Arc<dyn LexicalResource>>,
        similarity: Option<Arc<dyn SimilarityModel>>,
    ) -> SharedHumanizer {
        Self::new_observed(settings, rewrite_client, lexicon, similarity, Arc::new(TracingObserver))
    }

    pub fn new_observed(
        settings: EngineSettings,
        rewrite_client: Option<Arc<dyn CompletionClient>>,
        lexicon: Option<Arc<dyn LexicalResource>>,
        similarity: Option<Arc<dyn SimilarityModel>>,
        observer: Arc<dyn PassObserver>,
    ) -> SharedHumanizer {
        let rewrite = rewrite_client.map(|client| RewriteAdapter::new(client, settings.rewrite_timeout));
        let model = similarity.unwrap_or_else(|| Arc::new(JaccardSimilarity));
        let drift_guard = DriftGuard::new(model, settings.drift_threshold);

        Arc::new(Self {
            settings,
            rewrite,
            lexicon,
            drift_guard,
            observer,
        })
    }

    /// Rule-driven passes only
    pub fn new_simple() -> SharedHumanizer {
        Self::new(EngineSettings::default(), None, None, None)
    }

    /// Wire HTTP collaborators for every configured endpoint
    pub fn from_endpoints(endpoints: &ServiceEndpoints, mut settings: EngineSettings) -> SharedHumanizer {
        settings.rewrite_timeout = endpoints.rewrite_timeout;

        let rewrite_client = endpoints.rewrite_url.as_ref().map(|url| {
            Arc::new(OpenAiClient::new(
                url,
                endpoints.rewrite_api_key.clone(),
                endpoints.rewrite_model.clone(),
            )) as Arc<dyn CompletionClient>
        });
        let lexicon = endpoints
            .lexicon_url
            .as_ref()
            .map(|url| Arc::new(HttpLexicon::new(url.clone())) as Arc<dyn LexicalResource>);
        let similarity = endpoints.embedding_url.as_ref().map(|url| {
            Arc::new(HttpEmbeddingSimilarity::new(url, endpoints.embedding_model.clone())) as Arc<dyn SimilarityModel>
        });

        Self::new(settings, rewrite_client, lexicon, similarity)
    }

    /// Main entry point: humanize one document
    pub async fn humanize(&self, text: &str, cfg: Configuration) -> Result<HumanizeResponse> {
        self.humanize_with_cancel(text, cfg, &CancelFlag::new()).await
    }

    /// Humanize several documents concurrently; each gets its own random source
    pub async fn humanize_batch(&self, texts: &[String], cfg: Configuration) -> Vec<Result<HumanizeResponse>> {
        info!("Humanizing batch of {} documents", texts.len());
        let runs = texts.iter().map(|text| self.humanize(text, cfg.clone()));
        join_all(runs).await
    }

    pub async fn humanize_with_cancel(
        &self,
        text: &str,
        cfg: Configuration,
        cancel: &CancelFlag,
    ) -> Result<HumanizeResponse> {
        if text.trim().is_empty() {
            debug!("Empty input; returning sentinel");
            return Ok(HumanizeResponse::sentinel());
        }

        let start = Instant::now();
        let cfg = cfg.normalized();
        let mut rng = rng::seeded(cfg.random_seed);

        info!(
            "Humanizing: tone={}, formality={:.2}, intensity={:?}, seed={:?}, {} words",
            cfg.tone,
            cfg.formality,
            cfg.intensity(),
            cfg.random_seed,
            word_count(text)
        );

        // Step 1: Lift citations and quotations out of reach
        let (tagged, spans) = preserve::extract(text, cfg.preserve_citations, cfg.preserve_quotes);
        debug!("Preserved {} spans", spans.len());

        // Step 2: Ordered passes
        let mut state = PipelineState::new(tagged);
        let mut rewrite_accepted = false;

        for kind in &self.settings.passes {
            if cancel.is_cancelled() {
                info!("Humanization cancelled before pass '{}'", kind.name());
                return Err(HumanizeError::Cancelled(kind.name()));
            }

            let pass = self.run_pass(*kind, &state.text, &cfg, &mut rng).await;

            if pass.accepted {
                if *kind == PassKind::ExternalRewrite && pass.after != pass.before {
                    rewrite_accepted = true;
                }
                state.text = pass.after.clone();
            }

            // the log carries real citations and quotes, never placeholders
            let pass = PassRecord {
                before: preserve::restore(&pass.before, &spans),
                after: preserve::restore(&pass.after, &spans),
                ..pass
            };
            self.observer.on_pass(&pass);
            state.passes.push(pass);
        }

        // Step 3: Restore preserved spans
        let restored = preserve::restore(&state.text, &spans);

        // Step 4: Changes and metrics over the clean text
        let changes = diff_changes(text, &restored, rewrite_accepted);
        let metrics = metrics::compute(text, &restored, &self.settings.metrics_policy, &mut rng);

        // Step 5: Watermark last so nothing downstream disturbs the marks
        let (final_text, watermark) = match cfg.integrity_mode {
            IntegrityMode::Academic => {
                let (marked, watermark) = watermark::embed(&restored);
                (marked, Some(watermark))
            }
            IntegrityMode::Editor => (restored, None),
        };

        let rejected = state.passes.iter().filter(|p| !p.accepted).count();
        info!(
            "Humanization complete: {} passes ({} rejected), {} changes, human score {:.1} in {}ms",
            state.passes.len(),
            rejected,
            changes.len(),
            metrics.human_score,
            start.elapsed().as_millis()
        );

        Ok(HumanizeResponse {
            text: final_text,
            changes,
            metrics,
            passes: state.passes,
            watermark,
        })
    }

    /// Run one pass over `text`. The returned record says whether its output
    /// should replace the working text.
    pub async fn run_pass(&self, kind: PassKind, text: &str, cfg: &Configuration, rng: &mut PassRng) -> PassRecord {
        let intensity = cfg.intensity();

        let after = match kind {
            PassKind::ExternalRewrite => {
                let Some(adapter) = &self.rewrite else {
                    return record(kind, text, text.to_string(), true, None);
                };
                let profile = InstructionProfile::from_config(cfg);
                match adapter.rewrite(text, &profile).await {
                    RewriteOutcome::Rewritten(after) => after,
                    RewriteOutcome::Failed => return record(kind, text, text.to_string(), true, None),
                    RewriteOutcome::MarkersLost => return record(kind, text, text.to_string(), false, None),
                }
            }
            PassKind::PatternSubstitution => {
                let mut doc = Document::parse(text);
                for sentence in doc.sentences_mut() {
                    if is_protected(sentence) {
                        continue;
                    }
                    *sentence = patterns::apply(sentence, &PATTERN_TABLE, intensity.pattern_probability(), rng);
                }
                doc.render()
            }
            PassKind::Restructure => {
                let mut doc = Document::parse(text);
                restructure_document(&mut doc, intensity.restructure_probability(), rng);
                doc.render()
            }
            PassKind::LexicalDiversity => {
                // lookups complete before the first draw
                let external = match &self.lexicon {
                    Some(resource) => lexicon::resolve_external(text, resource.as_ref()).await,
                    None => ExternalSynonyms::new(),
                };
                lexicon::diversify(text, intensity.synonym_probability(), &external, rng)
            }
            PassKind::StyleInjection => {
                let mut doc = Document::parse(text);
                style::inject(&mut doc, cfg, rng);
                doc.render()
            }
            PassKind::HumanQuirks => {
                let mut doc = Document::parse(text);
                style::inject_quirks(&mut doc, cfg.formality, rng);
                doc.render()
            }
            PassKind::Polish => style::polish(text),
        };

        if kind.is_drift_guarded() {
            self.guarded(kind, text, after).await
        } else {
            record(kind, text, after, true, None)
        }
    }

    async fn guarded(&self, kind: PassKind, before: &str, after: String) -> PassRecord {
        if after == before {
            return record(kind, before, after, true, None);
        }
        let check = self.drift_guard.check(before, &after).await;
        record(kind, before, after, check.accepted, Some(check.similarity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::MockCompletionClient;
    use crate::similarity::FixedSimilarity;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<PassKind>>,
    }

    impl PassObserver for RecordingObserver {
        fn on_pass(&self, record: &PassRecord) {
            self.seen.lock().unwrap().push(record.name);
        }
    }

    fn seeded_config(seed: u64) -> Configuration {
        Configuration {
            random_seed: Some(seed),
            ..Configuration::default()
        }
    }

    #[tokio::test]
    async fn test_observer_sees_every_pass_in_order() {
        let observer = Arc::new(RecordingObserver::default());
        let engine = Humanizer::new_observed(EngineSettings::default(), None, None, None, observer.clone());
        engine
            .humanize("It is important to note that the plan works well here.", seeded_config(1))
            .await
            .unwrap();
        assert_eq!(*observer.seen.lock().unwrap(), PassKind::ordered());
    }

    #[tokio::test]
    async fn test_pass_subset_from_settings() {
        let settings = EngineSettings {
            passes: vec![PassKind::Polish],
            ..EngineSettings::default()
        };
        let engine = Humanizer::new(settings, None, None, None);
        let response = engine.humanize("hello  there , friend.", seeded_config(3)).await.unwrap();
        assert_eq!(response.passes.len(), 1);
        assert_eq!(response.text, "Hello there, friend.");
    }

    #[tokio::test]
    async fn test_rewrite_without_client_is_noop() {
        let engine = Humanizer::new_simple();
        let mut rng = rng::seeded(Some(5));
        let pass = engine
            .run_pass(PassKind::ExternalRewrite, "Some text here.", &Configuration::default(), &mut rng)
            .await;
        assert!(pass.accepted);
        assert_eq!(pass.after, pass.before);
    }

    #[tokio::test]
    async fn test_rejected_rewrite_keeps_working_text() {
        let client = Arc::new(MockCompletionClient::replying("Bananas are yellow."));
        let engine = Humanizer::new(
            EngineSettings {
                passes: vec![PassKind::ExternalRewrite],
                ..EngineSettings::default()
            },
            Some(client.clone() as Arc<dyn CompletionClient>),
            None,
            Some(Arc::new(FixedSimilarity(0.2))),
        );
        let response = engine
            .humanize("The committee approved the budget.", seeded_config(9))
            .await
            .unwrap();
        assert_eq!(client.calls(), 1);
        assert_eq!(response.text, "The committee approved the budget.");
        assert!(!response.passes[0].accepted);
        assert_eq!(response.passes[0].similarity, Some(0.2));
        assert_eq!(response.passes[0].after, "Bananas are yellow.");
    }

    #[tokio::test]
    async fn test_accepted_rewrite_gives_summary_change() {
        let client = Arc::new(MockCompletionClient::replying("The board signed off on the budget."));
        let engine = Humanizer::new(
            EngineSettings {
                passes: vec![PassKind::ExternalRewrite],
                ..EngineSettings::default()
            },
            Some(client),
            None,
            Some(Arc::new(FixedSimilarity(0.95))),
        );
        let response = engine
            .humanize("The committee approved the budget.", seeded_config(9))
            .await
            .unwrap();
        assert_eq!(response.text, "The board signed off on the budget.");
        assert_eq!(response.changes.len(), 1);
        assert_eq!(response.changes[0].position, 0);
    }

    #[tokio::test]
    async fn test_restructure_goes_through_drift_guard() {
        let engine = Humanizer::new(EngineSettings::default(), None, None, Some(Arc::new(FixedSimilarity(0.0))));
        let text = "Because the weather was bad, the whole team stayed inside for the entire day.";
        let cfg = Configuration {
            formality: 0.0,
            ..Configuration::default()
        };

        let mut changed = 0;
        for seed in 0..40 {
            let mut rng = rng::seeded(Some(seed));
            let pass = engine.run_pass(PassKind::Restructure, text, &cfg, &mut rng).await;
            if pass.after != pass.before {
                changed += 1;
                assert!(!pass.accepted);
                assert_eq!(pass.similarity, Some(0.0));
            }
        }
        assert!(changed > 0);
    }

    #[tokio::test]
    async fn test_unguarded_pass_ignores_similarity() {
        let engine = Humanizer::new(EngineSettings::default(), None, None, Some(Arc::new(FixedSimilarity(0.0))));
        let mut rng = rng::seeded(Some(1));
        let pass = engine
            .run_pass(PassKind::Polish, "hello  there , friend.", &Configuration::default(), &mut rng)
            .await;
        assert_ne!(pass.after, pass.before);
        assert!(pass.accepted);
        assert_eq!(pass.similarity, None);
    }

    #[tokio::test]
    async fn test_pass_log_holds_restored_spans() {
        let observer = Arc::new(RecordingObserver::default());
        let engine = Humanizer::new_observed(EngineSettings::default(), None, None, None, observer.clone());
        let text = "It is important to note that researchers (Smith, 2020) found results. \
                    He said 'it's fine' and we utilize the data in order to move on.";
        let response = engine.humanize(text, seeded_config(4)).await.unwrap();

        for pass in &response.passes {
            assert!(pass.before.contains("(Smith, 2020)"), "{}", pass.before);
            assert!(pass.after.contains("'it's fine'"), "{}", pass.after);
            assert!(!pass.before.contains(crate::preserve::PLACEHOLDER_OPEN));
            assert!(!pass.after.contains(crate::preserve::PLACEHOLDER_OPEN));
        }
        assert_eq!(observer.seen.lock().unwrap().len(), response.passes.len());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_from_endpoints_wires_configured_services() {
        let endpoints = ServiceEndpoints::from_lookup(|key| match key {
            "REWRITE_SERVICE_URL" => Some("http://127.0.0.1:9".to_string()),
            _ => None,
        });
        let engine = Humanizer::from_endpoints(&endpoints, EngineSettings::default());
        assert!(engine.rewrite.is_some());
        assert!(engine.lexicon.is_none());
    }
}
