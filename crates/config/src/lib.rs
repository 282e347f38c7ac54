//! Configuration loading, validation, and management for MindMate.
//!
//! Loads configuration from `~/.mindmate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.mindmate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used for classification and replies
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Path to the knowledge base JSON file
    #[serde(default = "default_knowledge_base")]
    pub knowledge_base: PathBuf,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub response: ResponseConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_knowledge_base() -> PathBuf {
    PathBuf::from("knowledge_base.json")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("knowledge_base", &self.knowledge_base)
            .field("embedding", &self.embedding)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("classifier", &self.classifier)
            .field("response", &self.response)
            .field("backend", &self.backend)
            .field("providers", &self.providers)
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Which backend and model produce knowledge-base embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name; falls back to `default_provider` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Results must score strictly above this
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

fn default_top_k() -> usize {
    2
}
fn default_min_score() -> f32 {
    0.1
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: default_min_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Turns kept per session
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Trailing turns sent with each prompt
    #[serde(default = "default_window")]
    pub window: usize,
}

fn default_max_turns() -> usize {
    20
}
fn default_window() -> usize {
    6
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            window: default_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_classifier_temperature")]
    pub temperature: f32,
}

fn default_classifier_max_tokens() -> u32 {
    10
}
fn default_classifier_temperature() -> f32 {
    0.1
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_classifier_max_tokens(),
            temperature: default_classifier_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseConfig {
    #[serde(default = "default_response_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_response_temperature")]
    pub temperature: f32,

    /// Substituted for the model's reply when generation fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
}

fn default_response_max_tokens() -> u32 {
    300
}
fn default_response_temperature() -> f32 {
    0.7
}
fn default_fallback_message() -> String {
    "I'm having trouble replying right now.".into()
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_response_max_tokens(),
            temperature: default_response_temperature(),
            fallback_message: default_fallback_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Deadline for every individual backend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Providers tried in order after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fallback_providers: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Upper bound on live sessions; the oldest is evicted beyond it
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.mindmate/config.toml).
    ///
    /// Also checks environment variables:
    /// - `MINDMATE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `MINDMATE_PROVIDER`, `MINDMATE_MODEL`, `MINDMATE_KNOWLEDGE_BASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("MINDMATE_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("MINDMATE_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("MINDMATE_MODEL") {
            self.default_model = model;
        }
        if let Some(path) = lookup("MINDMATE_KNOWLEDGE_BASE") {
            self.knowledge_base = PathBuf::from(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".mindmate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, t) in [
            ("classifier.temperature", self.classifier.temperature),
            ("response.temperature", self.response.temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        if self.context.max_turns < 2 {
            return Err(ConfigError::ValidationError(
                "context.max_turns must hold at least one exchange (2 turns)".into(),
            ));
        }

        if self.context.window > self.context.max_turns {
            return Err(ConfigError::ValidationError(
                "context.window cannot exceed context.max_turns".into(),
            ));
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.timeout_secs must be > 0".into(),
            ));
        }

        if self.response.fallback_message.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "response.fallback_message cannot be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Provider name used for embeddings.
    pub fn embedding_provider(&self) -> &str {
        self.embedding
            .provider
            .as_deref()
            .unwrap_or(&self.default_provider)
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            knowledge_base: default_knowledge_base(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            classifier: ClassifierConfig::default(),
            response: ResponseConfig::default(),
            backend: BackendConfig::default(),
            providers: HashMap::new(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
