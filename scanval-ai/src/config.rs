//! Configuration for scanval-ai
//!
//! Loaded from TOML (see `scanval_common::config` for file resolution). Every
//! section has defaults, so an absent or partial file still yields a working
//! configuration.
//!
//! The order of `[[sources]]` entries is the identification priority order.

use scanval_common::config::{load_toml, resolve_config_path, resolve_credential, CONFIG_ENV_VAR};
use scanval_common::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Analysis calls must finish within single-digit seconds
const MAX_PROVIDER_TIMEOUT_MS: u64 = 9_999;

/// Top-level service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub identification: IdentificationConfig,
    pub analysis: AnalysisConfig,
    /// Identification sources in priority order
    pub sources: Vec<SourceConfig>,
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentificationConfig {
    /// Hard ceiling per source lookup
    pub fetch_timeout_ms: u64,
    /// Cached identifications (0 disables the cache)
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Hard ceiling per provider call
    pub provider_timeout_ms: u64,
    /// Generation length cap passed to providers
    pub max_output_tokens: u32,
}

/// One identification source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Adapter name (`barcode_lookup`, `upcitemdb`, `ebay_browse`, `open_food_facts`)
    pub name: String,
    /// Base URL override
    pub endpoint: Option<String>,
    pub credential: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub requests_per_second: Option<u32>,
}

/// Request/response dialect of an analysis provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI chat completions and compatible services
    OpenAi,
    Anthropic,
    Gemini,
}

/// One analysis provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Stable provider name, also used for the credential env var
    pub name: String,
    pub kind: ProviderKind,
    /// Full endpoint URL override
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub credential: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub requests_per_second: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

impl Default for IdentificationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 4_000,
            cache_capacity: 512,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 8_000,
            max_output_tokens: 800,
        }
    }
}

impl SourceConfig {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoint: None,
            credential: None,
            enabled: true,
            requests_per_second: None,
        }
    }

    /// Credential from environment or TOML
    pub fn resolved_credential(&self) -> Option<String> {
        resolve_credential(&self.name, self.credential.as_deref())
    }
}

impl ProviderConfig {
    fn new(name: &str, kind: ProviderKind, endpoint: Option<&str>, model: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            endpoint: endpoint.map(str::to_string),
            model: Some(model.to_string()),
            credential: None,
            enabled: true,
            requests_per_second: None,
        }
    }

    /// Credential from environment or TOML
    pub fn resolved_credential(&self) -> Option<String> {
        resolve_credential(&self.name, self.credential.as_deref())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            identification: IdentificationConfig::default(),
            analysis: AnalysisConfig::default(),
            sources: vec![
                SourceConfig::named("barcode_lookup"),
                SourceConfig::named("upcitemdb"),
                SourceConfig::named("ebay_browse"),
                SourceConfig::named("open_food_facts"),
            ],
            providers: vec![
                ProviderConfig::new("openai", ProviderKind::OpenAi, None, "gpt-4o-mini"),
                ProviderConfig::new("anthropic", ProviderKind::Anthropic, None, "claude-3-5-haiku-latest"),
                ProviderConfig::new("gemini", ProviderKind::Gemini, None, "gemini-1.5-flash"),
                ProviderConfig::new(
                    "deepseek",
                    ProviderKind::OpenAi,
                    Some("https://api.deepseek.com/chat/completions"),
                    "deepseek-chat",
                ),
                ProviderConfig::new(
                    "mistral",
                    ProviderKind::OpenAi,
                    Some("https://api.mistral.ai/v1/chat/completions"),
                    "mistral-small-latest",
                ),
            ],
        }
    }
}

impl ServiceConfig {
    /// Load configuration
    ///
    /// **Priority:** `cli_path` → `SCANVAL_CONFIG` → user config dir → defaults
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let config = match resolve_config_path(cli_path, CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml::<ServiceConfig>(&path)?
            }
            None => {
                info!("No configuration file found, using defaults");
                ServiceConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.identification.fetch_timeout_ms == 0 {
            return Err(Error::Config("identification.fetch_timeout_ms must be positive".to_string()));
        }
        if self.analysis.provider_timeout_ms == 0
            || self.analysis.provider_timeout_ms > MAX_PROVIDER_TIMEOUT_MS
        {
            return Err(Error::Config(format!(
                "analysis.provider_timeout_ms must be between 1 and {}",
                MAX_PROVIDER_TIMEOUT_MS
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for name in self
            .sources
            .iter()
            .map(|s| &s.name)
            .chain(self.providers.iter().map(|p| &p.name))
        {
            if name.trim().is_empty() {
                return Err(Error::Config("Adapter name cannot be empty".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::Config(format!("Duplicate adapter name: {}", name)));
            }
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.identification.fetch_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis.provider_timeout_ms)
    }
}
