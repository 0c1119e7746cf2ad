//! Experiment planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Sampling parameters sent with every model call
    pub generation: GenerationConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Terminal client configuration
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .expplanner.yml
        let local_config = PathBuf::from(".expplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/expplanner/expplanner.yml
        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are ignored here; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".expplanner.yml")];
                paths.extend(user_config_path());
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| Self::load_from_file(p).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("expplanner").join("expplanner.yml"))
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds; unset leaves the transport default
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: None,
        }
    }
}

impl LlmConfig {
    /// Resolve the config against the process environment
    ///
    /// Fails when the API key variable is unset or empty, so a server never
    /// starts without a usable credential.
    pub fn resolve(&self) -> Result<ResolvedLlmConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve using a caller-supplied variable lookup
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedLlmConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!(provider = %self.provider, api_key_env = %self.api_key_env, "resolve_with: called");
        let api_key = lookup(&self.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| eyre::eyre!("LLM API key not found. Set the {} environment variable.", self.api_key_env))?;

        Ok(ResolvedLlmConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            api_key,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            timeout_ms: self.timeout_ms,
        })
    }
}

/// LLM configuration with the credential already read from the environment
#[derive(Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_ms: Option<u64>,
}

impl std::fmt::Debug for ResolvedLlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Sampling parameters for the generative model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f64,

    #[serde(rename = "top-p")]
    pub top_p: f64,

    #[serde(rename = "top-k")]
    pub top_k: u32,

    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    #[serde(rename = "response-mime-type")]
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,

    /// Apply a permissive CORS layer for browser clients
    pub cors: bool,

    /// Log inbound request payloads verbatim
    #[serde(rename = "log-payloads")]
    pub log_payloads: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors: true,
            log_payloads: true,
        }
    }
}

/// Terminal client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of a running `ep serve`
    #[serde(rename = "server-url")]
    pub server_url: String,

    /// Directory holding the persisted form and transcript
    #[serde(rename = "state-dir")]
    pub state_dir: PathBuf,

    /// Request timeout in milliseconds; unset leaves the transport default
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/expplanner/state on Linux)
        let state_dir = dirs::data_local_dir()
            .map(|d| d.join("expplanner").join("state"))
            .unwrap_or_else(|| PathBuf::from(".expplanner-state"));

        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            state_dir,
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
        assert!(config.server.log_payloads);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_generation_defaults() {
        let generation = GenerationConfig::default();

        assert_eq!(generation.temperature, 1.0);
        assert_eq!(generation.top_p, 0.95);
        assert_eq!(generation.top_k, 40);
        assert_eq!(generation.max_output_tokens, 8192);
        assert_eq!(generation.response_mime_type, "text/plain");
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

llm:
  provider: gemini
  model: gemini-1.5-pro
  api-key-env: MY_API_KEY
  base-url: https://llm.example.com/
  timeout-ms: 60000

generation:
  temperature: 0.2
  top-k: 10

server:
  bind: 0.0.0.0:9000
  log-payloads: false

client:
  server-url: http://planner.internal:9000
  state-dir: /tmp/planner-state
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.api_key_env, "MY_API_KEY");
        assert_eq!(config.llm.timeout_ms, Some(60000));
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.top_k, 10);
        assert_eq!(config.generation.top_p, 0.95);
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert!(config.server.cors);
        assert!(!config.server.log_payloads);
        assert_eq!(config.client.server_url, "http://planner.internal:9000");
        assert_eq!(config.client.state_dir, PathBuf::from("/tmp/planner-state"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
llm:
  model: gemini-1.5-flash
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.api_key_env, "GOOGLE_API_KEY");
        assert!(config.llm.timeout_ms.is_none());
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_resolve_fails_without_key() {
        let config = LlmConfig::default();
        let err = config.resolve_with(|_| None).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let err = config.resolve_with(|_| Some("   ".to_string())).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_resolve_reads_named_variable() {
        let config = LlmConfig {
            api_key_env: "PLANNER_KEY".to_string(),
            base_url: "https://llm.example.com/".to_string(),
            ..Default::default()
        };

        let resolved = config
            .resolve_with(|name| (name == "PLANNER_KEY").then(|| "secret".to_string()))
            .unwrap();

        assert_eq!(resolved.api_key, "secret");
        assert_eq!(resolved.base_url, "https://llm.example.com");
        assert!(!format!("{:?}", resolved).contains("secret"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("planner.yml");
        fs::write(&path, "log-level: warn\nserver:\n  bind: 127.0.0.1:0\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:0");
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_explicit_path_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
