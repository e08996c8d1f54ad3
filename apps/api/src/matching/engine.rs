//! Skill Matcher: one scoring invocation end to end.
//!
//! Flow: extract required skills (JD) → fail fast if none → extract candidate
//!       skills and chunks (resume) → cascade over a fresh cache → score.
//!
//! Stateless between invocations: every call owns its `EmbeddingCache`, which is
//! dropped (with any in-flight provider calls) when the call ends or is cancelled.

use std::sync::Arc;

use tracing::{info, warn};

use crate::embedding_client::EmbeddingProvider;
use crate::matching::cache::EmbeddingCache;
use crate::matching::cascade::{run_cascade, MatchConfig};
use crate::matching::chunker::split_into_chunks;
use crate::matching::extractor::extract_skills;
use crate::matching::scorer::{MatchWeights, ScoreResult};
use crate::matching::vocabulary::SkillVocabulary;
use crate::matching::ScoringError;

#[derive(Clone)]
pub struct SkillMatcher {
    provider: Arc<dyn EmbeddingProvider>,
    config: MatchConfig,
    weights: MatchWeights,
}

impl SkillMatcher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: MatchConfig) -> Self {
        Self {
            provider,
            config,
            weights: MatchWeights::default(),
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Scores `resume_text` against `jd_text` over `vocabulary`.
    pub async fn score(
        &self,
        jd_text: &str,
        resume_text: &str,
        vocabulary: &SkillVocabulary,
    ) -> Result<ScoreResult, ScoringError> {
        let required = extract_skills(jd_text, vocabulary);
        if required.is_empty() {
            warn!(
                "No vocabulary skills found in job description ({} chars, {} skill vocabulary)",
                jd_text.chars().count(),
                vocabulary.len()
            );
            return Err(ScoringError::NoExtractableSkills);
        }

        let candidates = extract_skills(resume_text, vocabulary);
        let chunks = split_into_chunks(resume_text);
        info!(
            "Matching {} required skills against {} resume skills and {} chunks",
            required.len(),
            candidates.len(),
            chunks.len()
        );

        let cache = EmbeddingCache::new(
            self.provider.as_ref(),
            self.config.max_concurrent_embeddings,
            self.config.embedding_timeout,
        );
        let records = run_cascade(&required, &candidates, &chunks, &cache, &self.config).await?;
        let result = ScoreResult::from_records(records, &self.weights)?;

        info!(
            "Score {}/100: exact={}, semantic={}, context={}, missing={} \
             ({} provider calls, {} texts cached)",
            result.final_score,
            result.matches.exact.len(),
            result.matches.semantic.len(),
            result.matches.context.len(),
            result.matches.missing.len(),
            cache.provider_calls(),
            cache.cached_texts()
        );

        Ok(result)
    }
}
