//! Axum route handlers for the Skill Matching API.

use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::extract_resume_text;
use crate::matching::extractor::extract_skills;
use crate::matching::scorer::{build_summary, ScoreResult};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScoreTextRequest {
    pub jd_text: String,
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub run_id: Uuid,
    pub scored_at: DateTime<Utc>,
    pub result: ScoreResult,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractSkillsRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractSkillsResponse {
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VocabularyInfoResponse {
    pub source: String,
    pub skill_count: usize,
    pub embedding_provider: String,
    pub semantic_threshold: f32,
    pub context_threshold: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/score/text
///
/// Scores a plain-text resume against a job description.
pub async fn handle_score_text(
    State(state): State<AppState>,
    Json(request): Json<ScoreTextRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }

    let response = run_scoring(&state, &request.jd_text, &request.resume_text).await?;
    Ok(Json(response))
}

/// POST /api/v1/score
///
/// Multipart upload: a `resume` file (PDF or plain text) and a `jd_text` field.
pub async fn handle_score_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScoreResponse>, AppError> {
    let mut jd_text: Option<String> = None;
    let mut resume_text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "jd_text" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable jd_text: {e}")))?;
                jd_text = Some(text);
            }
            "resume" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable resume: {e}")))?;
                let text = extract_resume_text(
                    bytes.to_vec(),
                    file_name.as_deref(),
                    content_type.as_deref(),
                )
                .await?;
                resume_text = Some(text);
            }
            _ => {}
        }
    }

    let jd_text = jd_text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("jd_text field is required".to_string()))?;
    let resume_text = resume_text
        .ok_or_else(|| AppError::Validation("resume file is required".to_string()))?;

    let response = run_scoring(&state, &jd_text, &resume_text).await?;
    Ok(Json(response))
}

/// POST /api/v1/skills/extract
///
/// Returns the vocabulary skills found in `text`, in vocabulary order.
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    Json(request): Json<ExtractSkillsRequest>,
) -> Result<Json<ExtractSkillsResponse>, AppError> {
    let skills = extract_skills(&request.text, &state.vocabulary);
    Ok(Json(ExtractSkillsResponse { skills }))
}

/// GET /api/v1/skills
pub async fn handle_vocabulary_info(
    State(state): State<AppState>,
) -> Json<VocabularyInfoResponse> {
    let config = state.matcher.config();
    Json(VocabularyInfoResponse {
        source: state.vocabulary_source.clone(),
        skill_count: state.vocabulary.len(),
        embedding_provider: state.matcher.provider_name().to_string(),
        semantic_threshold: config.semantic_threshold,
        context_threshold: config.context_threshold,
    })
}

async fn run_scoring(
    state: &AppState,
    jd_text: &str,
    resume_text: &str,
) -> Result<ScoreResponse, AppError> {
    let run_id = Uuid::new_v4();

    let result = state
        .matcher
        .score(jd_text, resume_text, &state.vocabulary)
        .instrument(info_span!("score_run", %run_id))
        .await?;

    let summary = build_summary(&result);
    info!(%run_id, final_score = result.final_score, "Scoring run complete");

    Ok(ScoreResponse {
        run_id,
        scored_at: Utc::now(),
        result,
        summary,
    })
}
