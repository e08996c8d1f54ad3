//! Scorer: turns categorized match records into one weighted percentage.
//!
//! final_score = round(min(100, 100 × Σ weight(record) / total_required))
//! Rounding is half-up: scores are never negative, so `f64::round` (half away
//! from zero) rounds 12.5 to 13.

use serde::{Deserialize, Serialize};

use crate::matching::cascade::{MatchRecord, SNIPPET_DISPLAY_CHARS};
use crate::matching::ScoringError;

/// Scores strictly above this read as an excellent match.
pub const EXCELLENT_MATCH_SCORE: u32 = 75;

// ────────────────────────────────────────────────────────────────────────────
// Weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub exact: f64,
    pub semantic: f64,
    pub context: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            exact: 1.0,
            semantic: 0.8,
            context: 0.5,
        }
    }
}

impl MatchWeights {
    pub fn weight(&self, record: &MatchRecord) -> f64 {
        match record {
            MatchRecord::Exact { .. } => self.exact,
            MatchRecord::Semantic { .. } => self.semantic,
            MatchRecord::Context { .. } => self.context,
            MatchRecord::Missing { .. } => 0.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Result model
// ────────────────────────────────────────────────────────────────────────────

/// Records grouped by tier, each group in required-skill order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedMatches {
    pub exact: Vec<MatchRecord>,
    pub semantic: Vec<MatchRecord>,
    pub context: Vec<MatchRecord>,
    pub missing: Vec<MatchRecord>,
}

impl CategorizedMatches {
    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        let mut matches = Self::default();
        for record in records {
            match record {
                MatchRecord::Exact { .. } => matches.exact.push(record),
                MatchRecord::Semantic { .. } => matches.semantic.push(record),
                MatchRecord::Context { .. } => matches.context.push(record),
                MatchRecord::Missing { .. } => matches.missing.push(record),
            }
        }
        matches
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_required: usize,
    pub matches: CategorizedMatches,
    pub final_score: u32, // 0 – 100
}

impl ScoreResult {
    /// Builds the result for one cascade run: one record per required skill.
    pub fn from_records(
        records: Vec<MatchRecord>,
        weights: &MatchWeights,
    ) -> Result<Self, ScoringError> {
        let final_score = compute_final_score(&records, weights)?;
        Ok(Self {
            total_required: records.len(),
            matches: CategorizedMatches::from_records(records),
            final_score,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring
// ────────────────────────────────────────────────────────────────────────────

/// Weighted percentage over `records`. An empty slice is the no-skills condition,
/// never a 0% or 100% score.
pub fn compute_final_score(
    records: &[MatchRecord],
    weights: &MatchWeights,
) -> Result<u32, ScoringError> {
    if records.is_empty() {
        return Err(ScoringError::NoExtractableSkills);
    }

    let earned: f64 = records.iter().map(|r| weights.weight(r)).sum();
    let percent = (100.0 * earned / records.len() as f64).clamp(0.0, 100.0);
    Ok(percent.round() as u32)
}

/// Human-readable verdict for a result, naming up to three missing skills.
pub fn build_summary(result: &ScoreResult) -> String {
    let score = result.final_score;
    let top_missing: Vec<&str> = result
        .matches
        .missing
        .iter()
        .take(3)
        .map(MatchRecord::required_skill)
        .collect();

    let mut summary = if score > EXCELLENT_MATCH_SCORE {
        format!(
            "Excellent match ({score}/100). Your resume covers {} of {} required skills \
             directly or by close equivalent.",
            result.matches.exact.len() + result.matches.semantic.len(),
            result.total_required
        )
    } else if top_missing.is_empty() {
        format!(
            "Optimization needed ({score}/100). \
             Name the skills implied by your experience explicitly."
        )
    } else {
        format!(
            "Optimization needed ({score}/100). Consider adding: {}.",
            top_missing.join(", ")
        )
    };

    if let Some(record) = result.matches.context.first() {
        if let Some(snippet) = record.display_snippet(SNIPPET_DISPLAY_CHARS) {
            summary.push_str(&format!(
                " '{}' is only implied by: \"{snippet}\"",
                record.required_skill()
            ));
        }
    }

    summary
}
