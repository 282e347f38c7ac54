//! Error types for the MindMate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type. Per-turn failures
//! (`BackendError`) are always recovered; startup failures
//! (`IndexBuildError`, `KnowledgeBaseError`) may abort the process.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all MindMate operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Index build error: {0}")]
    IndexBuild(#[from] IndexBuildError),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures reported by a provider implementation.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

/// A backend call made during a turn that did not produce usable output.
///
/// Every variant is recoverable: the pipeline degrades instead of failing.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The call failed, was refused, or timed out.
    #[error("Backend unavailable: {0}")]
    Unavailable(ProviderError),

    /// The call succeeded but the payload had the wrong shape.
    #[error("Malformed backend output: {0}")]
    MalformedOutput(String),
}

impl From<ProviderError> for BackendError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidResponse(reason) => BackendError::MalformedOutput(reason),
            other => BackendError::Unavailable(other),
        }
    }
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Unavailable(ProviderError::Timeout(_)))
    }
}

/// Failure to build the knowledge index at startup. Fatal.
#[derive(Debug, Clone, Error)]
pub enum IndexBuildError {
    #[error("embedding backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("embedding backend returned {got} vectors for {expected} entries")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding for '{key}' has dimension {got}, expected {expected}")]
    DimensionMismatch {
        key: String,
        expected: usize,
        got: usize,
    },
}

/// Failure to read a knowledge base file.
#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("Failed to read knowledge base at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse knowledge base at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Knowledge base at {path} must be a JSON object or array, found {found}")]
    UnsupportedShape { path: PathBuf, found: &'static str },
}
