//! Provider router: selects the correct backend based on config.
//!
//! Handles provider creation and routing requests to the right backend.
//! Generation and embeddings may be served by different providers.

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;
use mindmate_config::AppConfig;
use mindmate_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Routes backend requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Wrap `primary` and the named fallbacks into one chain.
    ///
    /// `budget` is the deadline for the whole call. Each entry gets an equal
    /// share of it, so a hung provider still leaves time for the next one.
    /// Returns `primary` unchanged when there is nothing to fall back to.
    pub fn with_fallbacks(
        &self,
        primary: &str,
        fallbacks: &[String],
        budget: Duration,
    ) -> Option<Arc<dyn Provider>> {
        let head = self.get(primary)?;
        let tail: Vec<Arc<dyn Provider>> = fallbacks
            .iter()
            .filter(|name| name.as_str() != primary)
            .filter_map(|name| self.get(name))
            .collect();

        if tail.is_empty() {
            return Some(head);
        }

        let share = budget / (tail.len() as u32 + 1);
        debug!(
            primary,
            entries = tail.len() + 1,
            share_ms = share.as_millis() as u64,
            "Building fallback chain"
        );

        let chain = tail.into_iter().fold(
            FallbackProvider::new(format!("{primary}+fallback")).add(head, share),
            |f, p| f.add(p, share),
        );
        Some(Arc::new(chain))
    }
}

/// Build providers from configuration.
///
/// Every configured provider is registered, plus the default provider, the
/// embedding provider and all fallbacks even when they have no explicit
/// `[providers.<name>]` section.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)),
        );
    }

    let implicit = std::iter::once(config.default_provider.as_str())
        .chain(std::iter::once(config.embedding_provider()))
        .chain(config.backend.fallback_providers.iter().map(String::as_str));

    for name in implicit {
        if router.get(name).is_none() {
            debug!(provider = %name, "Registering provider with default settings");
            let api_key = config.api_key.clone().unwrap_or_default();
            router.register(
                name.to_string(),
                Arc::new(OpenAiCompatProvider::new(name, default_base_url(name), api_key)),
            );
        }
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
