//! Match Cascade: resolves every required skill to exactly one `MatchRecord`.
//!
//! Per required skill:
//! 1. exact: present in the candidate skills → `Exact`
//! 2. semantic: best candidate skill (excluding ones exactly matched by some other
//!    required skill) with similarity > `semantic_threshold` → `Semantic`
//! 3. context: best resume chunk with similarity > `context_threshold` → `Context`
//! 4. otherwise → `Missing`
//!
//! A candidate only replaces the current best when strictly more similar, so ties go
//! to the first one encountered.

use std::collections::HashSet;
use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matching::cache::EmbeddingCache;
use crate::matching::similarity::cosine_similarity;
use crate::matching::ScoringError;

pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.55;
/// Stricter semantic threshold observed in a second configuration of the same tier.
pub const STRICT_SEMANTIC_THRESHOLD: f32 = 0.65;
pub const DEFAULT_CONTEXT_THRESHOLD: f32 = 0.45;
pub const DEFAULT_MAX_CONCURRENT_EMBEDDINGS: usize = 8;
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(15);

/// Characters of a context snippet shown by `display_snippet`.
pub const SNIPPET_DISPLAY_CHARS: usize = 50;

/// Tunables for one cascade run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub semantic_threshold: f32,
    pub context_threshold: f32,
    pub max_concurrent_embeddings: usize,
    pub embedding_timeout: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            context_threshold: DEFAULT_CONTEXT_THRESHOLD,
            max_concurrent_embeddings: DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
            embedding_timeout: DEFAULT_EMBEDDING_TIMEOUT,
        }
    }
}

impl MatchConfig {
    pub fn strict() -> Self {
        Self {
            semantic_threshold: STRICT_SEMANTIC_THRESHOLD,
            ..Self::default()
        }
    }
}

/// Outcome for one required skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchRecord {
    Exact {
        skill: String,
    },
    Semantic {
        required_skill: String,
        matched_skill: String,
        similarity: f32,
    },
    Context {
        required_skill: String,
        similarity: f32,
        /// The full chunk; truncate only for display.
        snippet: String,
    },
    Missing {
        skill: String,
    },
}

impl MatchRecord {
    pub fn required_skill(&self) -> &str {
        match self {
            MatchRecord::Exact { skill } | MatchRecord::Missing { skill } => skill,
            MatchRecord::Semantic { required_skill, .. }
            | MatchRecord::Context { required_skill, .. } => required_skill,
        }
    }

    /// Context snippet cut to `max_chars` with a trailing ellipsis; `None` for other tiers.
    pub fn display_snippet(&self, max_chars: usize) -> Option<String> {
        let MatchRecord::Context { snippet, .. } = self else {
            return None;
        };
        if snippet.chars().count() <= max_chars {
            return Some(snippet.clone());
        }
        let cut: String = snippet.chars().take(max_chars).collect();
        Some(format!("{}...", cut.trim_end()))
    }
}

/// Runs the cascade for every required skill, returning records in `required` order.
///
/// Fails fast with `NoExtractableSkills` on an empty `required`, and fails the whole run
/// on the first provider error: a partial cascade would mis-score.
pub async fn run_cascade(
    required: &[String],
    candidates: &[String],
    chunks: &[String],
    cache: &EmbeddingCache<'_>,
    config: &MatchConfig,
) -> Result<Vec<MatchRecord>, ScoringError> {
    if required.is_empty() {
        return Err(ScoringError::NoExtractableSkills);
    }

    let required_set: HashSet<&str> = required.iter().map(String::as_str).collect();
    let candidate_set: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    // A candidate equal to some required skill is that skill's exact match.
    let semantic_pool: Vec<&str> = candidates
        .iter()
        .map(String::as_str)
        .filter(|c| !required_set.contains(c))
        .collect();
    let chunks: Vec<&str> = chunks.iter().map(String::as_str).collect();

    let tiers = Tiers {
        candidate_set,
        semantic_pool,
        chunks,
        cache,
        config,
    };

    try_join_all(required.iter().map(|skill| tiers.resolve(skill))).await
}

struct Tiers<'a, 'p> {
    candidate_set: HashSet<&'a str>,
    semantic_pool: Vec<&'a str>,
    chunks: Vec<&'a str>,
    cache: &'a EmbeddingCache<'p>,
    config: &'a MatchConfig,
}

impl<'a, 'p> Tiers<'a, 'p> {
    async fn resolve(&self, skill: &str) -> Result<MatchRecord, ScoringError> {
        if self.candidate_set.contains(skill) {
            debug!("'{skill}': exact match");
            return Ok(MatchRecord::Exact {
                skill: skill.to_string(),
            });
        }

        let target = self.cache.get(skill).await?;

        if let Some((matched, similarity)) = self.best_match(&target, &self.semantic_pool).await? {
            if similarity > self.config.semantic_threshold {
                debug!("'{skill}': semantic match '{matched}' ({similarity:.3})");
                return Ok(MatchRecord::Semantic {
                    required_skill: skill.to_string(),
                    matched_skill: matched.to_string(),
                    similarity,
                });
            }
        }

        if let Some((chunk, similarity)) = self.best_match(&target, &self.chunks).await? {
            if similarity > self.config.context_threshold {
                debug!("'{skill}': context match ({similarity:.3})");
                return Ok(MatchRecord::Context {
                    required_skill: skill.to_string(),
                    similarity,
                    snippet: chunk.to_string(),
                });
            }
        }

        debug!("'{skill}': missing");
        Ok(MatchRecord::Missing {
            skill: skill.to_string(),
        })
    }

    /// Most similar unit to `target`, first-seen on ties. NaN similarities never win.
    async fn best_match(
        &self,
        target: &[f32],
        units: &[&'a str],
    ) -> Result<Option<(&'a str, f32)>, ScoringError> {
        if units.is_empty() {
            return Ok(None);
        }

        let vectors = try_join_all(units.iter().map(|unit| self.cache.get(unit))).await?;

        let mut best: Option<(&'a str, f32)> = None;
        for (unit, vector) in units.iter().zip(&vectors) {
            let similarity = cosine_similarity(target, vector)?;
            if similarity.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, current)| similarity > current) {
                best = Some((*unit, similarity));
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding_client::stub::StubEmbedder;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn run(
        stub: &StubEmbedder,
        required: &[&str],
        candidates: &[&str],
        chunks: &[&str],
        config: MatchConfig,
    ) -> Result<Vec<MatchRecord>, ScoringError> {
        let cache = EmbeddingCache::new(
            stub,
            config.max_concurrent_embeddings,
            config.embedding_timeout,
        );
        run_cascade(
            &strings(required),
            &strings(candidates),
            &strings(chunks),
            &cache,
            &config,
        )
        .await
    }

    #[tokio::test]
    async fn test_exact_matches_never_escalate() {
        let stub = StubEmbedder::new(2);
        let records = run(
            &stub,
            &["python", "sql"],
            &["python", "sql", "react"],
            &["Some resume sentence that is long enough"],
            MatchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            records,
            vec![
                MatchRecord::Exact { skill: "python".into() },
                MatchRecord::Exact { skill: "sql".into() },
            ]
        );
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_semantic_match_above_threshold() {
        let stub = StubEmbedder::new(2)
            .with_vector("machine learning", vec![1.0, 0.0])
            .with_vector("deep learning", vec![0.7, 0.714_142_8]);
        let records = run(
            &stub,
            &["machine learning"],
            &["deep learning"],
            &[],
            MatchConfig::default(),
        )
        .await
        .unwrap();

        match &records[0] {
            MatchRecord::Semantic {
                required_skill,
                matched_skill,
                similarity,
            } => {
                assert_eq!(required_skill, "machine learning");
                assert_eq!(matched_skill, "deep learning");
                assert!((similarity - 0.7).abs() < 1e-4, "similarity was {similarity}");
            }
            other => panic!("expected semantic match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_strict_threshold_rejects_same_pair() {
        let stub = StubEmbedder::new(2)
            .with_vector("machine learning", vec![1.0, 0.0])
            .with_vector("deep learning", vec![0.6, 0.8]);
        let records = run(
            &stub,
            &["machine learning"],
            &["deep learning"],
            &[],
            MatchConfig::strict(),
        )
        .await
        .unwrap();

        assert_eq!(
            records,
            vec![MatchRecord::Missing { skill: "machine learning".into() }]
        );
    }

    #[tokio::test]
    async fn test_threshold_is_strictly_exceeded() {
        let stub = StubEmbedder::new(2)
            .with_vector("kotlin", vec![1.0, 0.0])
            .with_vector("scala", vec![1.0, 0.0]);
        let config = MatchConfig {
            semantic_threshold: 1.0,
            ..MatchConfig::default()
        };
        let records = run(&stub, &["kotlin"], &["scala"], &[], config).await.unwrap();

        assert_eq!(records, vec![MatchRecord::Missing { skill: "kotlin".into() }]);
    }

    #[tokio::test]
    async fn test_context_match_keeps_full_chunk() {
        let chunk = "Wrote complex relational database queries every single day";
        let stub = StubEmbedder::new(3)
            .with_vector("sql", vec![1.0, 0.0, 0.0])
            .with_vector(chunk, vec![0.5, 0.866_025_4, 0.0]);
        let records = run(&stub, &["sql"], &["python"], &[chunk], MatchConfig::default())
            .await
            .unwrap();

        match &records[0] {
            MatchRecord::Context {
                required_skill,
                similarity,
                snippet,
            } => {
                assert_eq!(required_skill, "sql");
                assert!(*similarity > DEFAULT_CONTEXT_THRESHOLD);
                assert_eq!(snippet, chunk);
            }
            other => panic!("expected context match, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_below_all_thresholds_is_missing() {
        let chunk = "Organised the annual company picnic for staff";
        let stub = StubEmbedder::new(2)
            .with_vector("sql", vec![1.0, 0.0])
            .with_vector("python", vec![0.3, 0.953_939_2])
            .with_vector(chunk, vec![0.4, 0.916_515_1]);
        let records = run(&stub, &["sql"], &["python"], &[chunk], MatchConfig::default())
            .await
            .unwrap();

        assert_eq!(records, vec![MatchRecord::Missing { skill: "sql".into() }]);
    }

    #[tokio::test]
    async fn test_ties_go_to_first_candidate() {
        let stub = StubEmbedder::new(2)
            .with_vector("golang", vec![1.0, 0.0])
            .with_vector("rust", vec![0.9, 0.1])
            .with_vector("zig", vec![0.9, 0.1]);
        let records = run(&stub, &["golang"], &["rust", "zig"], &[], MatchConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            &records[0],
            MatchRecord::Semantic { matched_skill, .. } if matched_skill == "rust"
        ));
    }

    #[tokio::test]
    async fn test_best_candidate_wins() {
        let stub = StubEmbedder::new(2)
            .with_vector("golang", vec![1.0, 0.0])
            .with_vector("rust", vec![0.6, 0.8])
            .with_vector("zig", vec![0.9, 0.1]);
        let records = run(&stub, &["golang"], &["rust", "zig"], &[], MatchConfig::default())
            .await
            .unwrap();

        assert!(matches!(
            &records[0],
            MatchRecord::Semantic { matched_skill, .. } if matched_skill == "zig"
        ));
    }

    #[tokio::test]
    async fn test_exactly_matched_candidates_leave_semantic_pool() {
        let stub = StubEmbedder::new(2)
            .with_vector("java", vec![1.0, 0.0])
            .with_vector("kotlin", vec![1.0, 0.0]);
        let records = run(&stub, &["java", "kotlin"], &["java"], &[], MatchConfig::default())
            .await
            .unwrap();

        assert_eq!(
            records,
            vec![
                MatchRecord::Exact { skill: "java".into() },
                MatchRecord::Missing { skill: "kotlin".into() },
            ]
        );
        assert_eq!(stub.calls_for("java"), 0);
    }

    #[tokio::test]
    async fn test_shared_candidates_embedded_once() {
        let stub = StubEmbedder::new(2).with_delay(std::time::Duration::from_millis(5));
        run(
            &stub,
            &["rust", "go", "zig"],
            &["python"],
            &["Maintained a large Python monolith for years"],
            MatchConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(stub.calls_for("python"), 1);
        assert_eq!(stub.calls_for("Maintained a large Python monolith for years"), 1);
    }

    #[tokio::test]
    async fn test_records_follow_required_order() {
        let stub = StubEmbedder::new(2);
        let records = run(
            &stub,
            &["zig", "python", "ada"],
            &["python"],
            &[],
            MatchConfig::default(),
        )
        .await
        .unwrap();

        let order: Vec<&str> = records.iter().map(MatchRecord::required_skill).collect();
        assert_eq!(order, vec!["zig", "python", "ada"]);
    }

    #[tokio::test]
    async fn test_empty_required_fails_fast() {
        let stub = StubEmbedder::new(2);
        let err = run(&stub, &[], &["python"], &[], MatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::NoExtractableSkills));
        assert_eq!(stub.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_fails_whole_run() {
        let stub = StubEmbedder::new(2).failing_on("sql");
        let err = run(&stub, &["python", "sql"], &["python"], &[], MatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::EmbeddingProvider(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_run() {
        let stub = StubEmbedder::new(2)
            .with_vector("sql", vec![1.0, 0.0])
            .with_vector("postgres", vec![1.0, 0.0, 0.0]);
        let err = run(&stub, &["sql"], &["postgres"], &[], MatchConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_display_snippet_truncates_context_only() {
        let long = MatchRecord::Context {
            required_skill: "sql".into(),
            similarity: 0.5,
            snippet: "x".repeat(80),
        };
        let shown = long.display_snippet(SNIPPET_DISPLAY_CHARS).unwrap();
        assert_eq!(shown, format!("{}...", "x".repeat(50)));

        let short = MatchRecord::Context {
            required_skill: "sql".into(),
            similarity: 0.5,
            snippet: "short snippet".into(),
        };
        assert_eq!(short.display_snippet(SNIPPET_DISPLAY_CHARS).unwrap(), "short snippet");

        let exact = MatchRecord::Exact { skill: "sql".into() };
        assert!(exact.display_snippet(SNIPPET_DISPLAY_CHARS).is_none());
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = MatchRecord::Missing { skill: "sql".into() };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "missing");
        assert_eq!(json["skill"], "sql");
    }
}
