//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/sitereport/) and project (.sitereport/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{collection, generation, network, storage};
use crate::report::composer::PageConfig;
use crate::types::{ReportError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Generative text service
    pub llm: LlmConfig,

    /// Generation-assisted section behavior
    pub generation: GenerationSettings,

    /// Period data collection
    pub collection: CollectionSettings,

    /// Placeholder resolution
    pub resolver: ResolverSettings,

    /// Page layout
    pub layout: PageConfig,

    /// Local store and output locations
    pub storage: StorageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            generation: GenerationSettings::default(),
            collection: CollectionSettings::default(),
            resolver: ResolverSettings::default(),
            layout: PageConfig::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReportError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ReportError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(ReportError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.section_timeout_secs == 0 {
            return Err(ReportError::Config(
                "generation.section_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.generation.max_concurrent_sections == 0 {
            return Err(ReportError::Config(
                "generation.max_concurrent_sections must be greater than 0".to_string(),
            ));
        }

        if self.collection.timeout_secs == 0 {
            return Err(ReportError::Config(
                "collection.timeout_secs must be greater than 0".to_string(),
            ));
        }

        self.layout.validate()
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "openai", "ollama", or "none"
    pub provider: String,

    /// Model name (provider default when empty)
    pub model: String,

    /// Custom API endpoint
    pub api_base: Option<String>,

    /// API key; never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// HTTP request timeout (seconds)
    pub timeout_secs: u64,

    /// Temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: String::new(),
            api_base: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
        }
    }
}

// =============================================================================
// Generation Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// When false every generation-assisted section uses its literal content
    pub enabled: bool,

    /// System persona sent with every request
    pub persona: String,

    /// Output token budget per section
    pub max_tokens: u32,

    /// Per-section timeout (seconds)
    pub section_timeout_secs: u64,

    /// Character budget for the data context
    pub max_context_chars: usize,

    /// Sections resolved concurrently
    pub max_concurrent_sections: usize,

    /// Delay before retrying a transient failure (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            persona: generation::DEFAULT_PERSONA.to_string(),
            max_tokens: generation::DEFAULT_MAX_TOKENS,
            section_timeout_secs: generation::DEFAULT_SECTION_TIMEOUT_SECS,
            max_context_chars: generation::DEFAULT_MAX_CONTEXT_CHARS,
            max_concurrent_sections: generation::DEFAULT_MAX_CONCURRENT_SECTIONS,
            retry_delay_ms: generation::DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl GenerationSettings {
    pub fn section_timeout(&self) -> Duration {
        Duration::from_secs(self.section_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// =============================================================================
// Collection / Resolver Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Aggregate timeout for all reads of one report (seconds)
    pub timeout_secs: u64,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: collection::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CollectionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What an unresolvable placeholder renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingTokenPolicy {
    /// Render nothing
    #[default]
    Empty,
    /// Render `[missing: path]`
    Marker,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub missing_token: MissingTokenPolicy,
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database path
    pub database_path: PathBuf,

    /// Directory generated reports are written to
    pub output_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = PathBuf::from(storage::APP_DIR);
        Self {
            database_path: base.join(storage::DATABASE_FILE),
            output_dir: base.join(storage::OUTPUT_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
        assert_eq!(config.resolver.missing_token, MissingTokenPolicy::Empty);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.generation.max_concurrent_sections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".into());
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("sk-secret"));
        assert!(format!("{:?}", config.llm).contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_token_policy_parse() {
        let settings: ResolverSettings = toml::from_str("missing_token = \"marker\"").unwrap();
        assert_eq!(settings.missing_token, MissingTokenPolicy::Marker);
    }
}
