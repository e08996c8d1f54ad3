mod config;
mod embedding_client;
mod errors;
mod ingest;
mod matching;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding_client::{EmbeddingProvider, HashingEmbedder, HttpEmbeddingClient};
use crate::matching::engine::SkillMatcher;
use crate::matching::vocabulary::{load_vocabulary, VocabularySource};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SkillMatch API v{}", env!("CARGO_PKG_VERSION"));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    // Load the skill vocabulary once; falls back to the embedded list on failure
    let vocabulary_source = VocabularySource::from_setting(config.skills_source.as_deref());
    let vocabulary = load_vocabulary(&vocabulary_source, &http).await;
    info!(
        "Skill vocabulary ready: {} skills from {}",
        vocabulary.len(),
        vocabulary_source
    );

    let provider = build_embedding_provider(&config)?;
    let match_config = config.match_config();
    info!(
        "Embedding provider: {} (semantic > {}, context > {})",
        provider.name(),
        match_config.semantic_threshold,
        match_config.context_threshold
    );

    let state = AppState {
        vocabulary: Arc::new(vocabulary),
        vocabulary_source: vocabulary_source.to_string(),
        matcher: SkillMatcher::new(provider, match_config),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Remote embeddings when `EMBEDDING_API_URL` is set, otherwise the local hashing embedder.
fn build_embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match &config.embedding_api_url {
        Some(url) => {
            let client = HttpEmbeddingClient::new(
                url,
                config.embedding_api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_dimensions,
            )?;
            info!("Remote embedding client initialized (model: {})", client.model());
            Ok(Arc::new(client))
        }
        None => {
            let embedder = match config.embedding_dimensions {
                Some(dimensions) => HashingEmbedder::new(dimensions),
                None => HashingEmbedder::default(),
            };
            warn!(
                "EMBEDDING_API_URL not set; using local hashing embedder ({} dimensions)",
                embedder.dimensions()
            );
            Ok(Arc::new(embedder))
        }
    }
}
