//! Knowledge base and semantic retrieval for MindMate.
//!
//! - [`KnowledgeBase`]: insertion-ordered topic → guidance map
//! - [`loader`]: tolerant JSON loading of a knowledge base file
//! - [`vector`]: cosine similarity and thresholded top-k ranking
//! - [`KnowledgeIndex`]: embeddings built once, queried per turn

pub mod base;
pub mod index;
pub mod loader;
pub mod vector;

pub use base::{KnowledgeBase, KnowledgeEntry};
pub use index::{KnowledgeIndex, RetrievalHit, RetrievalParams, RetrievalResult};
pub use vector::cosine_similarity;
