//! Embedding Client: the single boundary between skill matching and whatever
//! turns text into vectors.
//!
//! ARCHITECTURAL RULE: matching code only ever talks to `dyn EmbeddingProvider`.
//! The concrete backend (remote endpoint or local hashing) is chosen once at startup.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod hashing;
#[cfg(test)]
pub mod stub;

pub use hashing::HashingEmbedder;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A fixed-length vector representing one unit of text (a skill phrase or a chunk).
pub type EmbeddingVector = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed embedding: {0}")]
    MalformedVector(String),

    #[error("Expected exactly one embedding, got {0}")]
    CountMismatch(usize),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Capability interface for embedding providers.
///
/// Implementations must return vectors of one consistent dimensionality for a given
/// deployment. Callers never assume the vectors are unit length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;

    /// Short backend label for logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for any OpenAI-compatible `/embeddings` endpoint.
/// Retries 429 and 5xx responses with exponential backoff.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: Option<usize>,
}

impl HttpEmbeddingClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: String,
        dimensions: Option<usize>,
    ) -> Result<Self, EmbeddingError> {
        if base_url.trim().is_empty() {
            return Err(EmbeddingError::Config("missing embedding API URL".to_string()));
        }
        if model.trim().is_empty() {
            return Err(EmbeddingError::Config(
                "missing embedding model name".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: embeddings_endpoint(base_url),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            dimensions,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 500ms, 1s
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.endpoint).json(&request_body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, body);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let embedding = parse_single_embedding(&body)?;

            debug!(
                "Embedding call succeeded: dimension={}, model={}",
                embedding.len(),
                self.model
            );

            return Ok(embedding);
        }

        Err(last_error.unwrap_or(EmbeddingError::Api {
            status: 429,
            message: format!("rate limited after {MAX_RETRIES} retries"),
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Appends `/embeddings` unless the configured URL already points at it.
fn embeddings_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/embeddings") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/embeddings")
    }
}

/// Parses a single-input embeddings response body and validates the vector.
fn parse_single_embedding(body: &str) -> Result<EmbeddingVector, EmbeddingError> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)?;
    if parsed.data.len() != 1 {
        return Err(EmbeddingError::CountMismatch(parsed.data.len()));
    }
    parsed.data.sort_by_key(|d| d.index);
    let embedding = parsed.data.remove(0).embedding;

    if embedding.is_empty() {
        return Err(EmbeddingError::MalformedVector(
            "provider returned an empty vector".to_string(),
        ));
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::MalformedVector(
            "provider returned non-finite values".to_string(),
        ));
    }

    Ok(embedding)
}
