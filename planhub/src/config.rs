//! Planhub configuration types and loading

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::AgentKind;
use crate::signals::FreshnessConfig;

/// Main Planhub configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Per-agent freshness windows
    pub agents: AgentsConfig,

    /// Upstream signal fetch settings
    pub fetch: FetchConfig,

    /// Template manifest settings
    pub manifest: ManifestConfig,

    /// Artifact storage settings
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set. Call this early in
    /// startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.fetch.bearer_token_env).is_err() {
            return Err(eyre::eyre!(
                "Agent API token not found. Set the {} environment variable.",
                self.fetch.bearer_token_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .planhub.yml
        let local_config = PathBuf::from(".planhub.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/planhub/planhub.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("planhub").join("planhub.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8700,
        }
    }
}

/// Per-agent freshness windows, one field per configured kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub clo: FreshnessConfig,
    pub ta: FreshnessConfig,
    pub pace: FreshnessConfig,
    pub review: FreshnessConfig,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            clo: FreshnessConfig::hours(168),
            ta: FreshnessConfig::hours(24),
            pace: FreshnessConfig::hours(12),
            review: FreshnessConfig::hours(48),
        }
    }
}

impl AgentsConfig {
    /// Freshness windows keyed by agent kind
    pub fn freshness_map(&self) -> HashMap<AgentKind, FreshnessConfig> {
        HashMap::from([
            (AgentKind::Clo, self.clo),
            (AgentKind::Ta, self.ta),
            (AgentKind::Pace, self.pace),
            (AgentKind::Review, self.review),
        ])
    }
}

/// Upstream signal fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Base URL of the agent signal API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the bearer token
    #[serde(rename = "bearer-token-env")]
    pub bearer_token_env: String,

    /// Total attempts per agent fetch
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Per-attempt timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9100".to_string(),
            bearer_token_env: "PLANHUB_AGENTS_TOKEN".to_string(),
            max_retries: 3,
            timeout_ms: 15_000,
        }
    }
}

/// Template manifest settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Remote manifest URL; None means embedded-only
    pub url: Option<String>,

    /// Manifest cache TTL in seconds
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            url: None,
            ttl_secs: 300,
        }
    }
}

/// Artifact storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store root directory
    pub root: PathBuf,

    /// Public base URL signed artifact URLs point at
    #[serde(rename = "signed-url-base")]
    pub signed_url_base: String,

    /// Environment variable containing the URL signing secret
    #[serde(rename = "signed-url-secret-env")]
    pub signed_url_secret_env: String,

    /// Signed URL lifetime in seconds
    #[serde(rename = "signed-url-ttl-secs")]
    pub signed_url_ttl_secs: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".planhub/artifacts"),
            signed_url_base: "http://127.0.0.1:8700/artifacts".to_string(),
            signed_url_secret_env: "PLANHUB_URL_SECRET".to_string(),
            signed_url_ttl_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spec_windows() {
        let config = Config::default();
        assert_eq!(config.agents.clo.max_age_hours, 168);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.timeout_ms, 15_000);
        assert_eq!(config.storage.signed_url_ttl_secs, 60);
    }

    #[test]
    fn test_freshness_map_covers_all_kinds() {
        let map = AgentsConfig::default().freshness_map();
        for kind in AgentKind::ALL {
            assert!(map.contains_key(&kind));
        }
    }

    #[test]
    fn test_parse_yaml_kebab_case() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 9000
fetch:
  base-url: https://agents.example.dev
  max-retries: 5
agents:
  clo:
    max-age-hours: 72
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.fetch.base_url, "https://agents.example.dev");
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.agents.clo.max_age_hours, 72);
        // Unspecified fields keep their defaults.
        assert_eq!(config.agents.ta.max_age_hours, 24);
        assert_eq!(config.manifest.ttl_secs, 300);
    }

    #[test]
    fn test_validation_missing_token_env() {
        let mut config = Config::default();
        config.fetch.bearer_token_env = "NONEXISTENT_PLANHUB_TOKEN_12345".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("NONEXISTENT_PLANHUB_TOKEN_12345"));
    }
}
