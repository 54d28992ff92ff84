//! Engine settings, service endpoints and configuration loading

use crate::error::Result;
use crate::metrics::MetricsPolicy;
use crate::rewrite::{DEFAULT_MODEL, DEFAULT_REWRITE_TIMEOUT};
use crate::similarity::DEFAULT_DRIFT_THRESHOLD;
use crate::types::{ConfigOverrides, Configuration, PassKind};
use std::time::Duration;

/// Engine-wide knobs, fixed at construction
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub passes: Vec<PassKind>,
    pub rewrite_timeout: Duration,
    pub metrics_policy: MetricsPolicy,
    pub drift_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            passes: PassKind::ordered(),
            rewrite_timeout: DEFAULT_REWRITE_TIMEOUT,
            metrics_policy: MetricsPolicy::default(),
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
        }
    }
}

/// Where the optional collaborators live. Unset means "not configured".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceEndpoints {
    pub rewrite_url: Option<String>,
    pub rewrite_api_key: Option<String>,
    pub rewrite_model: String,
    pub rewrite_timeout: Duration,
    pub lexicon_url: Option<String>,
    pub embedding_url: Option<String>,
    pub embedding_model: String,
}

impl ServiceEndpoints {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let rewrite_timeout = get("REWRITE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REWRITE_TIMEOUT);

        Self {
            rewrite_url: get("REWRITE_SERVICE_URL"),
            rewrite_api_key: get("REWRITE_API_KEY"),
            rewrite_model: get("REWRITE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            rewrite_timeout,
            lexicon_url: get("LEXICON_SERVICE_URL"),
            embedding_url: get("EMBEDDING_SERVICE_URL"),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string()),
        }
    }
}

/// Parse a full configuration; missing fields take their defaults
pub fn parse_configuration(json: &str) -> Result<Configuration> {
    let cfg: Configuration = serde_json::from_str(json)?;
    Ok(cfg.normalized())
}

/// Parse a partial configuration (a request or a stored profile)
pub fn parse_overrides(json: &str) -> Result<ConfigOverrides> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HumanizeError;
    use crate::types::{IntegrityMode, Tone};
    use std::collections::HashMap;

    #[test]
    fn test_endpoints_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REWRITE_SERVICE_URL", "http://127.0.0.1:8000"),
            ("REWRITE_TIMEOUT_SECS", "5"),
            ("LEXICON_SERVICE_URL", "  "),
        ]
        .into_iter()
        .collect();
        let endpoints = ServiceEndpoints::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(endpoints.rewrite_url.as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(endpoints.rewrite_timeout, Duration::from_secs(5));
        assert_eq!(endpoints.rewrite_model, DEFAULT_MODEL);
        assert!(endpoints.lexicon_url.is_none());
        assert!(endpoints.embedding_url.is_none());
    }

    #[test]
    fn test_parse_configuration_defaults_and_clamping() {
        let cfg = parse_configuration(r#"{"tone": "Casual", "formality": 3.5, "integrity_mode": "academic"}"#).unwrap();
        assert_eq!(cfg.tone, Tone::Casual);
        assert_eq!(cfg.formality, 1.0);
        assert_eq!(cfg.integrity_mode, IntegrityMode::Academic);
        assert_eq!(cfg.burstiness, 0.5);
        assert!(cfg.preserve_citations);
    }

    #[test]
    fn test_unknown_tone_is_neutral() {
        let cfg = parse_configuration(r#"{"tone": "pirate"}"#).unwrap();
        assert_eq!(cfg.tone, Tone::Neutral);
    }

    #[test]
    fn test_malformed_configuration() {
        let err = parse_configuration(r#"{"formality": "high"}"#).unwrap_err();
        assert!(matches!(err, HumanizeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_parse_overrides() {
        let o = parse_overrides(r#"{"idiom_density": 0.9}"#).unwrap();
        assert_eq!(o.idiom_density, Some(0.9));
        assert!(o.tone.is_none());
    }
}
