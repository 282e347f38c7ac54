//! The MindMate response pipeline.
//!
//! Every turn follows the same path:
//!
//! 1. **Classify** the message as emotional or neutral
//! 2. **Retrieve** guidance from the knowledge index (emotional only)
//! 3. **Route** to the therapeutic or casual prompt template
//! 4. **Generate** a reply through the configured provider
//! 5. **Record** the exchange in the session's conversation context
//!
//! Backend failures never abort a turn; see [`pipeline`] for how each one
//! degrades.

pub mod bootstrap;
pub mod classifier;
pub mod context;
pub mod pipeline;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use bootstrap::{
    Backends, build_pipeline, build_pipeline_with, resolve_backends, resolve_backends_from,
};
pub use classifier::{Classification, EmotionClassifier};
pub use context::ConversationContext;
pub use pipeline::{ResponsePipeline, TurnOutcome, TurnStage};
pub use prompt::{PromptMode, PromptRequest, PromptRouter};
