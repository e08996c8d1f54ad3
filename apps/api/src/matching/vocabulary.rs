//! Vocabulary Normalizer: builds the canonical skill set every document is filtered through.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::matching::extractor::build_skill_pattern;

/// Built-in list used whenever the configured source is unavailable.
pub const FALLBACK_SKILLS: &str = "Java\nPython\nC++\nJavaScript\nReact\nNode.js\nSQL\n\
Data Analysis\nMachine Learning\nCommunication\nLeadership\nProject Management\nGit\nHTML\n\
CSS\nRedux\nTypeScript";

/// Any of these means the vocabulary is unavailable; the caller substitutes the fallback list.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read skills file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch skills list: {0}")]
    Http(#[from] reqwest::Error),

    #[error("skills list request returned status {0}")]
    Status(u16),

    #[error("skills list normalized to an empty vocabulary")]
    Empty,
}

/// Where the raw newline-delimited skill list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabularySource {
    Embedded,
    File(PathBuf),
    Url(String),
}

impl VocabularySource {
    /// `None` or blank selects the embedded list, `http(s)://` selects a URL,
    /// anything else is a file path.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => VocabularySource::Embedded,
            Some(v) if v.starts_with("http://") || v.starts_with("https://") => {
                VocabularySource::Url(v.to_string())
            }
            Some(v) => VocabularySource::File(PathBuf::from(v)),
        }
    }
}

impl fmt::Display for VocabularySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VocabularySource::Embedded => write!(f, "embedded"),
            VocabularySource::File(path) => write!(f, "file:{}", path.display()),
            VocabularySource::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One vocabulary skill with its compiled word-bounded pattern.
#[derive(Debug, Clone)]
pub struct SkillEntry {
    name: String,
    pattern: Regex,
}

impl SkillEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Deduplicated set of normalized skills. Immutable once built.
///
/// Keeps insertion order so extraction results are reproducible; membership
/// tests go through the hash set.
#[derive(Debug, Clone, Default)]
pub struct SkillVocabulary {
    entries: Vec<SkillEntry>,
    names: HashSet<String>,
}

impl SkillVocabulary {
    /// Builds a vocabulary from a raw newline-delimited list.
    pub fn from_lines(raw: &str) -> Self {
        Self::from_skills(raw.lines())
    }

    pub fn from_skills<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocabulary = Self::default();
        for skill in skills {
            if let Some(normalized) = normalize_skill(skill.as_ref()) {
                vocabulary.insert(normalized);
            }
        }
        vocabulary
    }

    pub fn fallback() -> Self {
        Self::from_lines(FALLBACK_SKILLS)
    }

    fn insert(&mut self, skill: String) {
        if self.names.contains(&skill) {
            return;
        }
        match build_skill_pattern(&skill) {
            Ok(pattern) => {
                self.names.insert(skill.clone());
                self.entries.push(SkillEntry {
                    name: skill,
                    pattern,
                });
            }
            Err(e) => warn!("Skipping skill '{skill}': pattern failed to compile: {e}"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, skill: &str) -> bool {
        self.names.contains(skill)
    }

    pub fn skills(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub(crate) fn entries(&self) -> &[SkillEntry] {
        &self.entries
    }
}

/// Strips `/` and `"`, trims and lowercases one raw line.
/// Returns `None` for anything of one character or less.
pub fn normalize_skill(line: &str) -> Option<String> {
    let cleaned = line
        .replace(|c: char| c == '/' || c == '"', "")
        .trim()
        .to_lowercase();
    (cleaned.chars().count() > 1).then_some(cleaned)
}

/// Loads the vocabulary from `source`, substituting the built-in list on any failure.
/// Never fails: a degraded vocabulary is better than no scoring at all.
pub async fn load_vocabulary(source: &VocabularySource, http: &Client) -> SkillVocabulary {
    match try_load_vocabulary(source, http).await {
        Ok(vocabulary) => {
            info!("Loaded {} skills from {}", vocabulary.len(), source);
            vocabulary
        }
        Err(e) => {
            warn!("Skill vocabulary unavailable from {source} ({e}); using built-in fallback list");
            SkillVocabulary::fallback()
        }
    }
}

async fn try_load_vocabulary(
    source: &VocabularySource,
    http: &Client,
) -> Result<SkillVocabulary, VocabularyError> {
    let raw = match source {
        VocabularySource::Embedded => return Ok(SkillVocabulary::fallback()),
        VocabularySource::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| VocabularyError::Io {
                    path: path.clone(),
                    source,
                })?
        }
        VocabularySource::Url(url) => {
            let response = http.get(url).send().await?;
            if !response.status().is_success() {
                return Err(VocabularyError::Status(response.status().as_u16()));
            }
            response.text().await?
        }
    };

    let vocabulary = SkillVocabulary::from_lines(&raw);
    if vocabulary.is_empty() {
        return Err(VocabularyError::Empty);
    }
    Ok(vocabulary)
}
