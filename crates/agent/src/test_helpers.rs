//! Shared test helpers for pipeline tests.

use mindmate_core::error::ProviderError;
use mindmate_core::message::Message;
use mindmate_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that replays scripted completion results.
///
/// Each call to `complete` pops the next result. Once the script is
/// exhausted, the `then` result (if any) repeats forever; otherwise calls
/// fail with `NotConfigured`. Every request is recorded.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    then: Option<Result<String, ProviderError>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            then: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn always(text: &str) -> Self {
        Self::new(Vec::new()).then(Ok(text.to_string()))
    }

    /// Always fail with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(Vec::new()).then(Err(error))
    }

    pub fn then(mut self, result: Result<String, ProviderError>) -> Self {
        self.then = Some(result);
        self
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let result = match next.or_else(|| self.then.clone()) {
            Some(result) => result,
            None => Err(ProviderError::NotConfigured("script exhausted".into())),
        };
        result.map(|text| make_text_response(&text, &model))
    }
}

/// A mock provider that never answers.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("unreachable".into()))
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(ProviderError::Network("unreachable".into()))
    }
}

/// Embeds text as keyword counts over a fixed vocabulary.
pub struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new(vocab: &[&'static str]) -> Self {
        Self {
            vocab: vocab.to_vec(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocab
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured("embedding only".into()))
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|t| self.vector(t)).collect(),
            model: request.model,
            usage: None,
        })
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str, model: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: model.into(),
    }
}
