//! Skill Extractor: finds which vocabulary skills a document mentions.
//!
//! Matching is whole-word and case-insensitive: "java" never matches inside
//! "javascript". Multi-word skills match as literal phrases.

use regex::Regex;

use crate::matching::vocabulary::SkillVocabulary;

/// Compiles the word-bounded pattern for one normalized skill.
///
/// Every regex metacharacter in the skill is escaped. `\b` only means something
/// next to a word character, so a boundary is asserted at an end of the phrase
/// only when that end is a word character ("c++" gets a leading `\b` only).
pub fn build_skill_pattern(skill: &str) -> Result<Regex, regex::Error> {
    let starts_with_word = skill.chars().next().is_some_and(is_word_char);
    let ends_with_word = skill.chars().last().is_some_and(is_word_char);

    let mut pattern = String::from("(?i)");
    if starts_with_word {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(skill));
    if ends_with_word {
        pattern.push_str(r"\b");
    }

    Regex::new(&pattern)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the distinct vocabulary skills mentioned in `text`, in vocabulary order.
///
/// O(|vocabulary| × |text|); vocabularies are bounded and this runs at most twice
/// per scoring invocation.
pub fn extract_skills(text: &str, vocabulary: &SkillVocabulary) -> Vec<String> {
    if text.trim().is_empty() || vocabulary.is_empty() {
        return Vec::new();
    }

    let normalized = text.to_lowercase();
    vocabulary
        .entries()
        .iter()
        .filter(|entry| entry.pattern().is_match(&normalized))
        .map(|entry| entry.name().to_string())
        .collect()
}
