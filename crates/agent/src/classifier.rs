//! Emotion classifier: decides which response path a message takes.
//!
//! The message is wrapped in a fixed instruction and sent to the generation
//! backend with a tiny output budget. The reply is decoded exactly once,
//! here, into a [`Classification`].

use std::sync::Arc;
use std::time::Duration;

use mindmate_config::ClassifierConfig;
use mindmate_core::error::BackendError;
use mindmate_core::message::Message;
use mindmate_core::provider::{Provider, ProviderRequest, within};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Whether a message calls for emotional support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Emotional,
    Neutral,
}

impl Classification {
    pub fn is_emotional(self) -> bool {
        self == Classification::Emotional
    }

    /// Decode a raw classifier reply.
    ///
    /// Emotional iff the trimmed, upper-cased text contains `EMOTIONAL`.
    pub fn from_reply(reply: &str) -> Self {
        if reply.trim().to_uppercase().contains("EMOTIONAL") {
            Classification::Emotional
        } else {
            Classification::Neutral
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Emotional => write!(f, "EMOTIONAL"),
            Classification::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

fn instruction(message: &str) -> String {
    format!(
        "Analyze the following message and determine if it contains emotional distress, \
         mental health concerns, or requests for emotional support.\n\n\
         Respond only with:\n\
         - \"EMOTIONAL\" if emotional content is detected\n\
         - \"NEUTRAL\" if it's normal conversation.\n\n\
         Message: \"{message}\""
    )
}

/// Binary emotional/neutral classifier backed by a generation call.
pub struct EmotionClassifier {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl EmotionClassifier {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        let defaults = ClassifierConfig::default();
        Self {
            provider,
            model: model.into(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            timeout,
        }
    }

    /// Override the output budget and temperature.
    pub fn with_settings(mut self, config: &ClassifierConfig) -> Self {
        self.max_tokens = config.max_tokens;
        self.temperature = config.temperature;
        self
    }

    /// Classify `message`, surfacing backend failures.
    ///
    /// An empty reply is [`BackendError::MalformedOutput`].
    pub async fn try_classify(&self, message: &str) -> Result<Classification, BackendError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(instruction(message))],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        };

        let response = within(self.timeout, "classification", self.provider.complete(request)).await?;
        let reply = response.message.content;
        if reply.trim().is_empty() {
            return Err(BackendError::MalformedOutput(
                "empty classification reply".into(),
            ));
        }

        let classification = Classification::from_reply(&reply);
        debug!(%classification, "Message classified");
        Ok(classification)
    }

    /// Classify `message`. Any backend failure yields [`Classification::Neutral`].
    pub async fn classify(&self, message: &str) -> Classification {
        match self.try_classify(message).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!(error = %e, "Classification failed, treating message as neutral");
                Classification::Neutral
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{HangingProvider, ScriptedProvider};
    use mindmate_core::error::ProviderError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn classifier(provider: Arc<dyn Provider>) -> EmotionClassifier {
        EmotionClassifier::new(provider, "test-model", TIMEOUT)
    }

    #[test]
    fn reply_decoding() {
        assert_eq!(Classification::from_reply("EMOTIONAL"), Classification::Emotional);
        assert_eq!(Classification::from_reply("  emotional.\n"), Classification::Emotional);
        assert_eq!(Classification::from_reply("NEUTRAL"), Classification::Neutral);
        assert_eq!(Classification::from_reply("I'm not sure"), Classification::Neutral);
    }

    #[test]
    fn classification_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&Classification::Emotional).unwrap(),
            "\"EMOTIONAL\""
        );
        assert_eq!(Classification::Neutral.to_string(), "NEUTRAL");
    }

    #[tokio::test]
    async fn emotional_reply() {
        let provider = Arc::new(ScriptedProvider::always("EMOTIONAL"));
        let c = classifier(provider.clone());

        let result = c.classify("I feel so alone lately").await;
        assert!(result.is_emotional());

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, Some(10));
        assert!((requests[0].temperature - 0.1).abs() < f32::EPSILON);
        assert!(requests[0].messages[0].content.contains("I feel so alone lately"));
    }

    #[tokio::test]
    async fn neutral_reply() {
        let c = classifier(Arc::new(ScriptedProvider::always("NEUTRAL")));
        assert_eq!(c.classify("What's 2+2?").await, Classification::Neutral);
    }

    #[tokio::test]
    async fn backend_error_maps_to_neutral() {
        let provider = Arc::new(ScriptedProvider::failing(ProviderError::Network(
            "connection refused".into(),
        )));
        let c = classifier(provider);

        let err = c.try_classify("I'm so stressed").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(c.classify("I'm so stressed").await, Classification::Neutral);
    }

    #[tokio::test]
    async fn empty_reply_is_malformed() {
        let c = classifier(Arc::new(ScriptedProvider::always("   ")));
        let err = c.try_classify("hello").await.unwrap_err();
        assert!(matches!(err, BackendError::MalformedOutput(_)));
        assert_eq!(c.classify("hello").await, Classification::Neutral);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_maps_to_neutral() {
        let c = EmotionClassifier::new(Arc::new(HangingProvider), "m", Duration::from_millis(200));
        let err = c.try_classify("I can't cope").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(c.classify("I can't cope").await, Classification::Neutral);
    }

    #[tokio::test]
    async fn settings_override() {
        let provider = Arc::new(ScriptedProvider::always("NEUTRAL"));
        let c = classifier(provider.clone()).with_settings(&ClassifierConfig {
            max_tokens: 4,
            temperature: 0.0,
        });
        c.classify("hi").await;
        assert_eq!(provider.requests()[0].max_tokens, Some(4));
    }
}
