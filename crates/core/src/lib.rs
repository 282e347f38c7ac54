//! # MindMate Core
//!
//! Domain types, traits, and error definitions for the MindMate support
//! chatbot. This crate has **no framework dependencies**: it defines the
//! vocabulary that the knowledge index, the response pipeline, the backends
//! and the outer surfaces all share.
//!
//! ## Design Philosophy
//!
//! The two backends the pipeline consumes (text generation and embeddings)
//! are one trait here, [`Provider`]. Implementations live in
//! `mindmate-providers`; tests swap in scripted mocks.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{BackendError, Error, IndexBuildError, KnowledgeBaseError, ProviderError, Result};
pub use message::{Message, Role, SessionId, Turn};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};
