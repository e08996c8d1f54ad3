use std::sync::Arc;

use crate::config::Config;
use crate::matching::engine::SkillMatcher;
use crate::matching::vocabulary::SkillVocabulary;

/// Shared application state injected into all route handlers via Axum extractors.
/// Everything here is read-only; per-request state (the embedding cache) lives in the handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Loaded once at startup (fallback list if the source was unavailable).
    pub vocabulary: Arc<SkillVocabulary>,
    pub vocabulary_source: String,
    pub matcher: SkillMatcher,
}
