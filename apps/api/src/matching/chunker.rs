//! Chunker: splits free text into sentence-like units for the context tier.

/// Units shorter than this (in chars) are headers or fragments and carry no context.
pub const MIN_CHUNK_CHARS: usize = 20;
/// Caps the cost of the context tier.
pub const MAX_CHUNKS: usize = 100;

/// Splits on `.`, `?` and `!`, trims each unit, drops short units and keeps the first
/// `MAX_CHUNKS`. Deterministic for a given input.
pub fn split_into_chunks(text: &str) -> Vec<String> {
    text.split(|c: char| matches!(c, '.' | '?' | '!'))
        .map(str::trim)
        .filter(|unit| unit.chars().count() >= MIN_CHUNK_CHARS)
        .take(MAX_CHUNKS)
        .map(String::from)
        .collect()
}
