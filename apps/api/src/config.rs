use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::matching::cascade::{
    MatchConfig, DEFAULT_CONTEXT_THRESHOLD, DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
    DEFAULT_SEMANTIC_THRESHOLD,
};

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Built once at startup and passed down explicitly; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Path or http(s) URL of the newline-delimited skills list. `None` = embedded list.
    pub skills_source: Option<String>,
    /// OpenAI-compatible embeddings endpoint. `None` = local hashing embedder.
    pub embedding_api_url: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimensions: Option<usize>,
    /// Raises the default semantic threshold to the strict preset.
    pub strict_matching: bool,
    pub semantic_threshold: f32,
    pub context_threshold: f32,
    pub embedding_concurrency: usize,
    pub embedding_timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let strict_matching = parse_or(&get, "STRICT_MATCHING", false)?;
        let default_semantic_threshold = if strict_matching {
            MatchConfig::strict().semantic_threshold
        } else {
            DEFAULT_SEMANTIC_THRESHOLD
        };

        let config = Config {
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            skills_source: get("SKILLS_SOURCE"),
            embedding_api_url: get("EMBEDDING_API_URL"),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions: get("EMBEDDING_DIMENSIONS")
                .map(|v| parse_value::<usize>("EMBEDDING_DIMENSIONS", &v))
                .transpose()?,
            strict_matching,
            semantic_threshold: parse_or(&get, "SEMANTIC_THRESHOLD", default_semantic_threshold)?,
            context_threshold: parse_or(&get, "CONTEXT_THRESHOLD", DEFAULT_CONTEXT_THRESHOLD)?,
            embedding_concurrency: parse_or(
                &get,
                "EMBEDDING_CONCURRENCY",
                DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
            )?,
            embedding_timeout_secs: parse_or(
                &get,
                "EMBEDDING_TIMEOUT_SECS",
                DEFAULT_EMBEDDING_TIMEOUT_SECS,
            )?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (-1.0..=1.0).contains(&self.semantic_threshold),
            "SEMANTIC_THRESHOLD must be within [-1, 1], got {}",
            self.semantic_threshold
        );
        ensure!(
            (-1.0..=1.0).contains(&self.context_threshold),
            "CONTEXT_THRESHOLD must be within [-1, 1], got {}",
            self.context_threshold
        );
        ensure!(
            self.embedding_concurrency >= 1,
            "EMBEDDING_CONCURRENCY must be at least 1"
        );
        ensure!(
            self.embedding_timeout_secs >= 1,
            "EMBEDDING_TIMEOUT_SECS must be at least 1"
        );
        ensure!(
            self.embedding_dimensions != Some(0),
            "EMBEDDING_DIMENSIONS must be positive"
        );
        Ok(())
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            semantic_threshold: self.semantic_threshold,
            context_threshold: self.context_threshold,
            max_concurrent_embeddings: self.embedding_concurrency,
            embedding_timeout: Duration::from_secs(self.embedding_timeout_secs),
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert!(config.skills_source.is_none());
        assert!(config.embedding_api_url.is_none());
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.match_config(), MatchConfig::default());
    }

    #[test]
    fn test_strict_threshold_override() {
        let config = config_from(&[("SEMANTIC_THRESHOLD", "0.65")]).unwrap();
        assert!((config.match_config().semantic_threshold - 0.65).abs() < f32::EPSILON);
    }

    #[test]
    fn test_strict_matching_raises_default_threshold() {
        let config = config_from(&[("STRICT_MATCHING", "true")]).unwrap();
        assert_eq!(config.match_config(), MatchConfig::strict());
    }

    #[test]
    fn test_explicit_threshold_wins_over_strict_matching() {
        let config =
            config_from(&[("STRICT_MATCHING", "true"), ("SEMANTIC_THRESHOLD", "0.6")]).unwrap();
        assert!((config.semantic_threshold - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("EMBEDDING_API_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.embedding_api_url.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_threshold_out_of_range_is_error() {
        assert!(config_from(&[("CONTEXT_THRESHOLD", "1.5")]).is_err());
    }

    #[test]
    fn test_zero_concurrency_is_error() {
        assert!(config_from(&[("EMBEDDING_CONCURRENCY", "0")]).is_err());
    }

    #[test]
    fn test_timeout_flows_into_match_config() {
        let config = config_from(&[("EMBEDDING_TIMEOUT_SECS", "3")]).unwrap();
        assert_eq!(config.match_config().embedding_timeout, Duration::from_secs(3));
    }
}
