//! Startup wiring: config → providers → knowledge index → pipeline.

use std::sync::Arc;

use mindmate_config::AppConfig;
use mindmate_core::error::{Error, Result};
use mindmate_core::provider::Provider;
use mindmate_knowledge::{KnowledgeBase, KnowledgeIndex, loader};
use mindmate_providers::router::{ProviderRouter, build_from_config};
use tracing::info;

use crate::pipeline::ResponsePipeline;

/// Generation and embedding backends resolved from config.
pub struct Backends {
    pub generator: Arc<dyn Provider>,
    pub embedder: Arc<dyn Provider>,
}

/// Resolve the generation and embedding providers, each wrapped in the
/// configured fallback chain.
pub fn resolve_backends(config: &AppConfig) -> Result<Backends> {
    resolve_backends_from(config, &build_from_config(config))
}

/// Like [`resolve_backends`], over an already populated router.
///
/// The backend timeout is the budget for a whole chain; the router splits
/// it between the entries.
pub fn resolve_backends_from(config: &AppConfig, router: &ProviderRouter) -> Result<Backends> {
    let timeout = config.backend.timeout();
    let fallbacks = &config.backend.fallback_providers;

    let generator = router
        .with_fallbacks(&config.default_provider, fallbacks, timeout)
        .ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;

    let embedder = router
        .with_fallbacks(config.embedding_provider(), fallbacks, timeout)
        .ok_or_else(|| Error::Config {
            message: format!(
                "embedding provider '{}' is not available",
                config.embedding_provider()
            ),
        })?;

    Ok(Backends {
        generator,
        embedder,
    })
}

/// Build a pipeline over an already loaded knowledge base.
pub async fn build_pipeline_with(
    config: &AppConfig,
    kb: KnowledgeBase,
    backends: Backends,
) -> Result<ResponsePipeline> {
    let index = KnowledgeIndex::build(
        kb,
        backends.embedder,
        config.embedding.model.clone(),
        config.backend.timeout(),
    )
    .await?;

    info!(
        provider = %backends.generator.name(),
        model = %config.default_model,
        knowledge_entries = index.len(),
        "Response pipeline ready"
    );

    Ok(ResponsePipeline::from_config(
        config,
        backends.generator,
        Arc::new(index),
    ))
}

/// Load the configured knowledge base and build the full pipeline.
///
/// An unreadable knowledge base is logged and treated as empty. Failing to
/// embed a non-empty one is fatal.
pub async fn build_pipeline(config: &AppConfig) -> Result<ResponsePipeline> {
    let backends = resolve_backends(config)?;
    let kb = loader::load_or_empty(&config.knowledge_base);
    build_pipeline_with(config, kb, backends).await
}
