//! Similarity Engine: cosine similarity between embedding vectors.

use crate::matching::ScoringError;

/// Sentinel for "no similarity": returned when either vector has zero magnitude,
/// so the cascade never ranks an undefined score as a best match.
pub const NO_SIMILARITY: f32 = -1.0;

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, clamped to `[-1, 1]`.
///
/// Both vectors must come from the same embedding space; a length mismatch is an
/// integration defect and fails the invocation with `DimensionMismatch`.
/// Accumulates in f64, so the result is exactly symmetric in its arguments.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, ScoringError> {
    if a.len() != b.len() {
        return Err(ScoringError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(NO_SIMILARITY);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !similarity.is_finite() {
        return Ok(NO_SIMILARITY);
    }

    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

/// Scales `vector` to unit length in place. Zero and non-finite magnitudes are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .map(|v| f64::from(*v) * f64::from(*v))
        .sum::<f64>()
        .sqrt();
    if norm > 0.0 && norm.is_finite() {
        for v in vector.iter_mut() {
            *v = (f64::from(*v) / norm) as f32;
        }
    }
}
