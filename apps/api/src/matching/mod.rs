// Skill matching engine.
// Flow: vocabulary → extract (JD + resume) → chunk resume → match cascade → score.
// All embedding calls go through embedding_client via the per-invocation cache.

use std::time::Duration;

use thiserror::Error;

use crate::embedding_client::EmbeddingError;

pub mod cache;
pub mod cascade;
pub mod chunker;
pub mod engine;
pub mod extractor;
pub mod handlers;
pub mod scorer;
pub mod similarity;
pub mod vocabulary;

/// Failure of a whole scoring invocation. No partial result is ever returned alongside one.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("No extractable skills found in the job description; use more standard terminology")]
    NoExtractableSkills,

    #[error("Embedding provider failed: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    #[error("Embedding provider timed out after {timeout:?} ({chars} char text unit)")]
    EmbeddingTimeout { chars: usize, timeout: Duration },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl ScoringError {
    /// Provider failures and timeouts may succeed if the whole invocation is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScoringError::EmbeddingProvider(_) | ScoringError::EmbeddingTimeout { .. }
        )
    }
}
