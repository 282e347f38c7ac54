//! Embedding index over the knowledge base.
//!
//! Every topic key is embedded once at startup in a single batched call.
//! Queries embed the incoming text and rank stored vectors by cosine
//! similarity.

use std::sync::Arc;
use std::time::Duration;

use mindmate_core::error::{BackendError, IndexBuildError};
use mindmate_core::provider::{EmbeddingRequest, Provider, within};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::base::{KnowledgeBase, KnowledgeEntry};
use crate::vector;

/// Ranking parameters for a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    /// Maximum number of hits returned.
    pub top_k: usize,
    /// Hits must score strictly above this.
    pub min_score: f32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 2,
            min_score: 0.1,
        }
    }
}

/// A single knowledge entry that matched a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub key: String,
    pub value: String,
    pub score: f32,
}

/// Ordered hits, best first. Possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn hits(&self) -> &[RetrievalHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|h| h.key.as_str())
    }
}

impl From<Vec<RetrievalHit>> for RetrievalResult {
    fn from(hits: Vec<RetrievalHit>) -> Self {
        Self { hits }
    }
}

impl IntoIterator for RetrievalResult {
    type Item = RetrievalHit;
    type IntoIter = std::vec::IntoIter<RetrievalHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a RetrievalHit;
    type IntoIter = std::slice::Iter<'a, RetrievalHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Knowledge entries paired with their key embeddings.
///
/// Immutable after [`KnowledgeIndex::build`]; shared freely across turns.
pub struct KnowledgeIndex {
    entries: Vec<KnowledgeEntry>,
    embeddings: Vec<Vec<f32>>,
    embedder: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension())
            .field("embedder", &self.embedder.name())
            .field("model", &self.model)
            .finish()
    }
}

impl KnowledgeIndex {
    /// Embed every key of `kb` and build the index.
    ///
    /// An empty knowledge base yields an empty index without calling the
    /// embedder. Any failure here is fatal to startup.
    pub async fn build(
        kb: KnowledgeBase,
        embedder: Arc<dyn Provider>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IndexBuildError> {
        let model = model.into();
        let entries = kb.into_entries();

        if entries.is_empty() {
            info!("Knowledge base is empty, retrieval disabled");
            return Ok(Self {
                entries,
                embeddings: Vec::new(),
                embedder,
                model,
                timeout,
            });
        }

        let request = EmbeddingRequest {
            model: model.clone(),
            inputs: entries.iter().map(|e| e.key.clone()).collect(),
        };

        let response = within(timeout, "knowledge embedding", embedder.embed(request))
            .await
            .map_err(BackendError::from)?;

        let embeddings = response.embeddings;
        if embeddings.len() != entries.len() {
            return Err(IndexBuildError::CountMismatch {
                expected: entries.len(),
                got: embeddings.len(),
            });
        }

        let dimension = embeddings[0].len();
        for (entry, embedding) in entries.iter().zip(&embeddings) {
            if embedding.len() != dimension || dimension == 0 {
                return Err(IndexBuildError::DimensionMismatch {
                    key: entry.key.clone(),
                    expected: dimension,
                    got: embedding.len(),
                });
            }
        }

        info!(
            entries = entries.len(),
            dimension,
            embedder = %embedder.name(),
            "Knowledge index built"
        );

        Ok(Self {
            entries,
            embeddings,
            embedder,
            model,
            timeout,
        })
    }

    /// Rank entries against `text`, surfacing backend failures.
    pub async fn try_query(
        &self,
        text: &str,
        params: RetrievalParams,
    ) -> Result<RetrievalResult, BackendError> {
        if self.is_empty() || params.top_k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let request = EmbeddingRequest {
            model: self.model.clone(),
            inputs: vec![text.to_string()],
        };
        let response = within(self.timeout, "query embedding", self.embedder.embed(request)).await?;

        let mut vectors = response.embeddings;
        if vectors.len() != 1 {
            return Err(BackendError::MalformedOutput(format!(
                "expected 1 query embedding, got {}",
                vectors.len()
            )));
        }
        let query = vectors.remove(0);
        if query.len() != self.dimension() {
            return Err(BackendError::MalformedOutput(format!(
                "query embedding has dimension {}, index has {}",
                query.len(),
                self.dimension()
            )));
        }

        let hits: Vec<RetrievalHit> =
            vector::rank(&query, &self.embeddings, params.top_k, params.min_score)
                .into_iter()
                .map(|(pos, score)| {
                    let entry = &self.entries[pos];
                    RetrievalHit {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                        score,
                    }
                })
                .collect();

        debug!(hits = hits.len(), top_k = params.top_k, "Knowledge query ranked");
        Ok(hits.into())
    }

    /// Rank entries against `text`. Any backend failure yields no hits.
    pub async fn query(&self, text: &str, params: RetrievalParams) -> RetrievalResult {
        match self.try_query(text, params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Knowledge retrieval failed, continuing without guidance");
                RetrievalResult::empty()
            }
        }
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension, or 0 for an empty index.
    pub fn dimension(&self) -> usize {
        self.embeddings.first().map_or(0, Vec::len)
    }
}
