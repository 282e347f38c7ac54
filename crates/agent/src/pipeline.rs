//! The per-turn response pipeline.
//!
//! Each turn moves through
//! `Received → Classified → (Retrieved) → Prompted → Generated → Recorded`.
//! Backend failures degrade instead of aborting the turn:
//!
//! - classification failure → neutral
//! - retrieval failure → no guidance
//! - generation failure or empty output → fixed fallback reply
//!
//! The exchange is recorded in the session context in every case.

use std::sync::Arc;
use std::time::Duration;

use mindmate_config::{AppConfig, ResponseConfig};
use mindmate_core::error::BackendError;
use mindmate_core::provider::{Provider, ProviderRequest, within};
use mindmate_knowledge::{KnowledgeIndex, RetrievalParams, RetrievalResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{Classification, EmotionClassifier};
use crate::context::ConversationContext;
use crate::prompt::{PromptMode, PromptRequest, PromptRouter};

/// A stage a turn has passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Received,
    Classified,
    Retrieved,
    Prompted,
    Generated,
    Recorded,
}

/// Everything that happened during one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The reply handed back to the caller. Never empty.
    pub response: String,
    pub classification: Classification,
    pub mode: PromptMode,
    /// Guidance injected into the prompt. Empty on the casual path.
    pub retrieved: RetrievalResult,
    pub stages: Vec<TurnStage>,
    /// Whether `response` is the fallback reply.
    pub fell_back: bool,
}

/// Orchestrates classification, retrieval, prompting and generation.
pub struct ResponsePipeline {
    classifier: EmotionClassifier,
    index: Arc<KnowledgeIndex>,
    router: PromptRouter,
    generator: Arc<dyn Provider>,
    model: String,
    retrieval: RetrievalParams,
    response: ResponseConfig,
    timeout: Duration,
}

impl ResponsePipeline {
    /// Create a pipeline with default settings.
    ///
    /// The generator also backs the classifier unless
    /// [`with_classifier`](Self::with_classifier) replaces it.
    pub fn new(
        generator: Arc<dyn Provider>,
        index: Arc<KnowledgeIndex>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let model = model.into();
        Self {
            classifier: EmotionClassifier::new(generator.clone(), model.clone(), timeout),
            index,
            router: PromptRouter::default(),
            generator,
            model,
            retrieval: RetrievalParams::default(),
            response: ResponseConfig::default(),
            timeout,
        }
    }

    /// Build a pipeline with every tunable taken from `config`.
    pub fn from_config(
        config: &AppConfig,
        generator: Arc<dyn Provider>,
        index: Arc<KnowledgeIndex>,
    ) -> Self {
        let timeout = config.backend.timeout();
        let classifier =
            EmotionClassifier::new(generator.clone(), config.default_model.clone(), timeout)
                .with_settings(&config.classifier);

        Self::new(generator, index, config.default_model.clone(), timeout)
            .with_classifier(classifier)
            .with_retrieval(RetrievalParams {
                top_k: config.retrieval.top_k,
                min_score: config.retrieval.min_score,
            })
            .with_window(config.context.window)
            .with_response_settings(config.response.clone())
    }

    pub fn with_classifier(mut self, classifier: EmotionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_retrieval(mut self, params: RetrievalParams) -> Self {
        self.retrieval = params;
        self
    }

    /// Set how many history turns go into each prompt.
    pub fn with_window(mut self, window: usize) -> Self {
        self.router = PromptRouter::new(window);
        self
    }

    /// Set generation limits and the fallback reply.
    ///
    /// A blank fallback reply is replaced with the default one, since a turn
    /// never answers with empty text.
    pub fn with_response_settings(mut self, mut response: ResponseConfig) -> Self {
        if response.fallback_message.trim().is_empty() {
            warn!("Blank fallback reply configured, using the default");
            response.fallback_message = ResponseConfig::default().fallback_message;
        }
        self.response = response;
        self
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }

    pub fn fallback_message(&self) -> &str {
        &self.response.fallback_message
    }

    /// Handle one user message and return the reply. Never fails.
    pub async fn handle_turn(&self, message: &str, context: &mut ConversationContext) -> String {
        self.handle_turn_detailed(message, context).await.response
    }

    /// Like [`handle_turn`](Self::handle_turn), but reports how the turn went.
    pub async fn handle_turn_detailed(
        &self,
        message: &str,
        context: &mut ConversationContext,
    ) -> TurnOutcome {
        let mut stages = vec![TurnStage::Received];
        debug!(chars = message.len(), "Turn received");

        let classification = self.classifier.classify(message).await;
        stages.push(TurnStage::Classified);

        let retrieved = if classification.is_emotional() {
            let result = self.index.query(message, self.retrieval).await;
            stages.push(TurnStage::Retrieved);
            debug!(hits = result.len(), "Guidance retrieved");
            result
        } else {
            RetrievalResult::empty()
        };

        let prompt = self
            .router
            .build(message, classification, &retrieved, context);
        let mode = prompt.mode;
        stages.push(TurnStage::Prompted);

        let (response, fell_back) = match self.try_generate(prompt).await {
            Ok(reply) => {
                stages.push(TurnStage::Generated);
                (reply, false)
            }
            Err(e) => {
                warn!(error = %e, "Generation failed, using fallback reply");
                (self.response.fallback_message.clone(), true)
            }
        };

        context.append(message, response.clone());
        stages.push(TurnStage::Recorded);

        info!(
            %classification,
            hits = retrieved.len(),
            fell_back,
            history = context.len(),
            "Turn complete"
        );

        TurnOutcome {
            response,
            classification,
            mode,
            retrieved,
            stages,
            fell_back,
        }
    }

    /// Send an assembled prompt to the generator.
    ///
    /// Empty or whitespace-only output is [`BackendError::MalformedOutput`].
    pub async fn try_generate(&self, prompt: PromptRequest) -> Result<String, BackendError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: prompt.into_messages(),
            temperature: self.response.temperature,
            max_tokens: Some(self.response.max_tokens),
        };

        let response = within(self.timeout, "generation", self.generator.complete(request)).await?;
        let reply = response.message.content.trim();
        if reply.is_empty() {
            return Err(BackendError::MalformedOutput("empty reply".into()));
        }
        Ok(reply.to_string())
    }
}
