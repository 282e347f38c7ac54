//! Prompt routing: picks a template and assembles the backend messages.
//!
//! Emotional messages get the therapeutic template with retrieved guidance
//! as background; everything else gets the casual template with no
//! knowledge at all.

use mindmate_core::message::{Message, Turn};
use mindmate_knowledge::RetrievalResult;
use serde::Serialize;

use crate::classifier::Classification;
use crate::context::ConversationContext;

/// Fixed system instruction sent first with every reply request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful and empathetic AI assistant.";

/// Knowledge section text when retrieval found nothing.
pub const NO_GUIDANCE: &str = "No relevant guidance found.";

/// Default number of history turns included in a prompt.
pub const DEFAULT_WINDOW: usize = 6;

/// Which template a prompt was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    Therapeutic,
    Casual,
}

/// A fully assembled reply request.
///
/// Rendered as: system instruction, history window, filled user turn.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub mode: PromptMode,
    pub system: String,
    pub history: Vec<Turn>,
    pub user_turn: String,
}

impl PromptRequest {
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system));
        messages.extend(self.history.iter().map(Turn::to_message));
        messages.push(Message::user(self.user_turn));
        messages
    }
}

/// Builds [`PromptRequest`]s from a classified message.
#[derive(Debug, Clone)]
pub struct PromptRouter {
    window: usize,
}

impl Default for PromptRouter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl PromptRouter {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn build(
        &self,
        user_message: &str,
        classification: Classification,
        retrieval: &RetrievalResult,
        context: &ConversationContext,
    ) -> PromptRequest {
        let (mode, user_turn) = match classification {
            Classification::Emotional => (
                PromptMode::Therapeutic,
                therapeutic(&knowledge_section(retrieval), user_message),
            ),
            Classification::Neutral => (PromptMode::Casual, casual(user_message)),
        };

        PromptRequest {
            mode,
            system: SYSTEM_INSTRUCTION.to_string(),
            history: context.recent_window(self.window).to_vec(),
            user_turn,
        }
    }
}

/// Render retrieved hits as `Topic:`/`Guidance:` blocks.
pub fn knowledge_section(retrieval: &RetrievalResult) -> String {
    if retrieval.is_empty() {
        return NO_GUIDANCE.to_string();
    }
    retrieval
        .hits()
        .iter()
        .map(|hit| format!("Topic: {}\nGuidance: {}", hit.key, hit.value))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn therapeutic(knowledge: &str, user_message: &str) -> String {
    format!(
        "You are a warm, empathetic AI Therapist.\n\n\
         Relevant guidance from KB (reference only):\n\
         {knowledge}\n\n\
         User's message: {user_message}\n\n\
         Instructions:\n\
         - DO NOT copy KB directly\n\
         - Summarize/adapt into warm, concise advice\n\
         - Personalize response to the user\n\
         - Offer practical, actionable tips if relevant\n\
         - Keep tone natural, supportive, and conversational\n\
         - Limit to 2-3 short paragraphs\n\n\
         Response:"
    )
}

fn casual(user_message: &str) -> String {
    format!(
        "You are a friendly AI assistant named MINDMATE AI.\n\
         Respond casually and helpfully without giving therapy unless asked.\n\n\
         User's message: {user_message}\n\n\
         Response:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmate_core::message::Role;
    use mindmate_knowledge::RetrievalHit;

    fn sleep_hit() -> RetrievalResult {
        vec![RetrievalHit {
            key: "sleep".into(),
            value: "try a consistent bedtime routine".into(),
            score: 0.82,
        }]
        .into()
    }

    #[test]
    fn emotional_uses_therapeutic_template_with_knowledge() {
        let router = PromptRouter::default();
        let ctx = ConversationContext::default();
        let prompt = router.build(
            "I can't sleep at night",
            Classification::Emotional,
            &sleep_hit(),
            &ctx,
        );

        assert_eq!(prompt.mode, PromptMode::Therapeutic);
        assert!(prompt.user_turn.contains("warm, empathetic AI Therapist"));
        assert!(prompt.user_turn.contains("Topic: sleep\nGuidance: try a consistent bedtime routine"));
        assert!(prompt.user_turn.contains("User's message: I can't sleep at night"));
        assert!(prompt.user_turn.contains("2-3 short paragraphs"));
        assert!(!prompt.user_turn.contains(NO_GUIDANCE));
    }

    #[test]
    fn emotional_without_hits_renders_placeholder() {
        let prompt = PromptRouter::default().build(
            "everything feels heavy",
            Classification::Emotional,
            &RetrievalResult::empty(),
            &ConversationContext::default(),
        );
        assert!(prompt.user_turn.contains(NO_GUIDANCE));
    }

    #[test]
    fn neutral_never_injects_knowledge() {
        let prompt = PromptRouter::default().build(
            "what's a good pasta recipe?",
            Classification::Neutral,
            &sleep_hit(),
            &ConversationContext::default(),
        );

        assert_eq!(prompt.mode, PromptMode::Casual);
        assert!(prompt.user_turn.contains("MINDMATE AI"));
        assert!(!prompt.user_turn.contains("bedtime"));
        assert!(!prompt.user_turn.contains("Guidance"));
    }

    #[test]
    fn messages_are_system_history_user() {
        let mut ctx = ConversationContext::default();
        for i in 0..5 {
            ctx.append(format!("u{i}"), format!("a{i}"));
        }

        let messages = PromptRouter::default()
            .build("hello", Classification::Neutral, &RetrievalResult::empty(), &ctx)
            .into_messages();

        assert_eq!(messages.len(), 8);
        assert_eq!(messages[0], Message::system(SYSTEM_INSTRUCTION));
        assert_eq!(messages[1], Message::user("u2"));
        assert_eq!(messages[6], Message::assistant("a4"));
        assert_eq!(messages[7].role, Role::User);
        assert!(messages[7].content.contains("User's message: hello"));
    }

    #[test]
    fn multiple_hits_joined_by_blank_line() {
        let retrieval: RetrievalResult = vec![
            RetrievalHit {
                key: "a".into(),
                value: "one".into(),
                score: 0.9,
            },
            RetrievalHit {
                key: "b".into(),
                value: "two".into(),
                score: 0.5,
            },
        ]
        .into();
        assert_eq!(
            knowledge_section(&retrieval),
            "Topic: a\nGuidance: one\n\nTopic: b\nGuidance: two"
        );
    }

    #[test]
    fn custom_window() {
        let mut ctx = ConversationContext::default();
        ctx.append("u", "a");
        let prompt = PromptRouter::new(1).build(
            "x",
            Classification::Neutral,
            &RetrievalResult::empty(),
            &ctx,
        );
        assert_eq!(prompt.history.len(), 1);
        assert_eq!(prompt.history[0].content(), "a");
    }
}
