//! Resolver configuration
//!
//! Loads resolver settings from YAML and the environment. Every field has a
//! default so an empty file (or no file at all) yields a working setup.
//! Provider availability is expressed as capability flags here rather than
//! looked up from the environment inside provider code.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

pub const DEFAULT_USER_AGENT: &str =
    "ownership-resolver/0.1 (https://github.com/ownership-resolver/ownership-resolver)";

/// Root configuration for the resolution engine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hop limit for one graph traversal
    pub max_depth: usize,
    /// Cap on deduplicated alternatives returned next to the best result
    pub max_alternatives: usize,
    /// Budget for a single provider contribution; also bounds one graph walk
    pub provider_timeout_secs: u64,
    /// Budget for one outbound call inside a graph walk
    pub call_timeout_secs: u64,
    /// Overall budget for one query; pending providers are dropped after it
    pub query_deadline_secs: u64,
    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Search language first, then label fallbacks
    pub languages: Vec<String>,
    /// Walk founder edges when an entity has no owner or parent
    pub include_founders: bool,
    pub cache_enabled: bool,
    pub providers: ProviderSettings,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_alternatives: 5,
            provider_timeout_secs: 10,
            call_timeout_secs: 5,
            query_deadline_secs: 30,
            http_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            languages: vec!["fr".to_string(), "en".to_string()],
            include_founders: false,
            cache_enabled: true,
            providers: ProviderSettings::default(),
        }
    }
}

/// Provider capability flags and endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub wikidata: bool,
    pub infobox: bool,
    pub text_search: bool,
    pub market_data: bool,
    pub wikidata_api_url: String,
    pub wikidata_sparql_url: String,
    pub wikidata_entity_url: String,
    /// `{lang}` is replaced with the search language
    pub wikipedia_api_url: String,
    pub market_data_url: String,
    #[serde(skip_serializing)]
    pub market_data_api_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            wikidata: true,
            infobox: true,
            text_search: true,
            market_data: true,
            wikidata_api_url: "https://www.wikidata.org/w/api.php".to_string(),
            wikidata_sparql_url: "https://query.wikidata.org/sparql".to_string(),
            wikidata_entity_url: "https://www.wikidata.org/wiki/Special:EntityData".to_string(),
            wikipedia_api_url: "https://{lang}.wikipedia.org/w/api.php".to_string(),
            market_data_url: "https://financialmodelingprep.com/api/v3".to_string(),
            market_data_api_key: None,
        }
    }
}

impl ProviderSettings {
    /// Market data needs both the flag and a key
    pub fn market_data_enabled(&self) -> bool {
        self.market_data
            && self
                .market_data_api_key
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty())
    }

    pub fn wikipedia_api_for(&self, lang: &str) -> String {
        self.wikipedia_api_url.replace("{lang}", lang)
    }
}

impl ResolverConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResolveError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ResolveError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ResolveError::Config(format!("Invalid resolver config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `.env` and process environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self, ResolveError> {
        dotenvy::dotenv().ok();

        if let Ok(depth) = std::env::var("OWNERSHIP_MAX_DEPTH") {
            self.max_depth = depth.trim().parse().map_err(|_| {
                ResolveError::Config(format!("OWNERSHIP_MAX_DEPTH is not a number: {}", depth))
            })?;
        }
        if let Ok(secs) = std::env::var("OWNERSHIP_QUERY_DEADLINE_SECS") {
            self.query_deadline_secs = secs.trim().parse().map_err(|_| {
                ResolveError::Config(format!(
                    "OWNERSHIP_QUERY_DEADLINE_SECS is not a number: {}",
                    secs
                ))
            })?;
        }
        if let Ok(key) = std::env::var("MARKET_DATA_API_KEY") {
            if !key.trim().is_empty() {
                self.providers.market_data_api_key = Some(key.trim().to_string());
            }
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.max_depth == 0 {
            return Err(ResolveError::Config("max_depth must be at least 1".into()));
        }
        if self.languages.iter().all(|l| l.trim().is_empty()) {
            return Err(ResolveError::Config(
                "at least one language is required".into(),
            ));
        }
        if self.provider_timeout_secs == 0
            || self.call_timeout_secs == 0
            || self.query_deadline_secs == 0
            || self.http_timeout_secs == 0
        {
            return Err(ResolveError::Config("timeouts must be non-zero".into()));
        }
        for (name, endpoint) in [
            ("wikidata_api_url", &self.providers.wikidata_api_url),
            ("wikidata_sparql_url", &self.providers.wikidata_sparql_url),
            ("wikidata_entity_url", &self.providers.wikidata_entity_url),
            ("market_data_url", &self.providers.market_data_url),
        ] {
            url::Url::parse(endpoint)
                .map_err(|e| ResolveError::Config(format!("{} is not a URL: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn query_deadline(&self) -> Duration {
        Duration::from_secs(self.query_deadline_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
