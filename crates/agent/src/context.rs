//! Session-scoped conversation log.
//!
//! Holds the most recent turns of one session, oldest first, and hands a
//! trailing window of them to the prompt router.

use mindmate_config::ContextConfig;
use mindmate_core::message::Turn;

/// Default number of turns retained per session.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Bounded, ordered log of role-tagged turns.
///
/// Alternation of roles is not enforced; only order is.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

impl ConversationContext {
    /// Create an empty context holding at most `max_turns` turns.
    ///
    /// `max_turns` is raised to 2 so a whole exchange always fits.
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(2);
        Self {
            turns: Vec::with_capacity(max_turns),
            max_turns,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_turns)
    }

    /// Seed a context from existing turns, keeping only the most recent.
    pub fn from_turns(turns: impl IntoIterator<Item = Turn>, max_turns: usize) -> Self {
        let mut context = Self::new(max_turns);
        context.turns.extend(turns);
        context.evict();
        context
    }

    /// Record one exchange: the user turn, then the assistant turn.
    pub fn append(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(Turn::user(user));
        self.turns.push(Turn::assistant(assistant));
        self.evict();
    }

    /// The last `n` turns (or fewer), oldest first.
    pub fn recent_window(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn evict(&mut self) {
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }
}
