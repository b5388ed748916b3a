//! Configuration types and loading

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

    /// Completion provider configuration
    pub llm: LlmConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .notaprompt.yml
        let local_config = PathBuf::from(".notaprompt.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/notaprompt/notaprompt.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("notaprompt").join("notaprompt.yml");
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
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Completion provider configuration
///
/// Both providers speak the OpenAI chat-completions dialect. Which one is
/// used is decided by which credential is present, see
/// [`crate::llm::select_provider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Environment variable holding the primary (OpenRouter) API key
    #[serde(rename = "openrouter-api-key-env")]
    pub openrouter_api_key_env: String,

    /// Environment variable holding the secondary (Groq) API key
    #[serde(rename = "groq-api-key-env")]
    pub groq_api_key_env: String,

    #[serde(rename = "openrouter-base-url")]
    pub openrouter_base_url: String,

    #[serde(rename = "groq-base-url")]
    pub groq_base_url: String,

    /// Free-tier model used on the primary provider
    #[serde(rename = "openrouter-model")]
    pub openrouter_model: String,

    /// General-purpose model used on the secondary provider
    #[serde(rename = "groq-model")]
    pub groq_model: String,

    /// `HTTP-Referer` routing header sent to OpenRouter
    pub referer: String,

    /// `X-Title` routing header sent to OpenRouter
    pub title: String,

    /// Maximum tokens per response (omitted from requests when unset)
    #[serde(rename = "max-tokens")]
    pub max_tokens: Option<u32>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key_env: "OPENROUTER_API_KEY".to_string(),
            groq_api_key_env: "GROQ_API_KEY".to_string(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            groq_base_url: "https://api.groq.com/openai/v1".to_string(),
            openrouter_model: "arcee-ai/trinity-large-preview:free".to_string(),
            groq_model: "llama-3.3-70b-versatile".to_string(),
            referer: "https://localhost:3000".to_string(),
            title: "Not A Prompt".to_string(),
            max_tokens: None,
            timeout_ms: 120_000,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `{name}.pmt` overrides before the embedded prompts
    #[serde(rename = "override-dir")]
    pub override_dir: PathBuf,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            override_dir: PathBuf::from(".notaprompt/prompts"),
        }
    }
}

/// Snapshot of the provider credentials, taken once at startup
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Primary provider (OpenRouter) key
    pub openrouter_api_key: Option<String>,

    /// Secondary provider (Groq) key; its presence switches provider selection
    pub groq_api_key: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env(config: &LlmConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup (tests use a map)
    ///
    /// Blank values count as absent.
    pub fn from_lookup<F>(config: &LlmConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let credentials = Self {
            openrouter_api_key: read(&config.openrouter_api_key_env),
            groq_api_key: read(&config.groq_api_key_env),
        };
        debug!(?credentials, "Credentials::from_lookup: resolved");
        credentials
    }

    /// True when at least one provider credential is present
    pub fn is_configured(&self) -> bool {
        self.openrouter_api_key.is_some() || self.groq_api_key.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.debug_struct("Credentials")
            .field("openrouter_api_key", &self.openrouter_api_key.as_ref().map(|_| "<set>"))
            .field("groq_api_key", &self.groq_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}
