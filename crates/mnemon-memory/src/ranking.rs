// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scoring helpers shared across memory stores.

use chrono::{DateTime, Utc};

/// Decay constant for working memory recency (10 minutes).
pub const WORKING_TAU_SECS: f64 = 600.0;

/// Decay constant for durable memory recency (1 day).
pub const DURABLE_TAU_SECS: f64 = 86_400.0;

/// Exponential time decay `exp(-Δt/τ)` in [0, 1].
pub fn recency(reference: DateTime<Utc>, now: DateTime<Utc>, tau_secs: f64) -> f64 {
    let delta = (now - reference).num_milliseconds().max(0) as f64 / 1000.0;
    (-delta / tau_secs).exp()
}

/// Final score for durable stores: similarity-dominated with importance
/// and recency as secondary signals.
pub fn durable_score(similarity: f64, importance: f64, recency: f64) -> f64 {
    0.6 * similarity + 0.2 * importance + 0.2 * recency
}

/// Lowercased alphanumeric tokens of a text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Fraction of query tokens present in the content tokens.
pub fn keyword_overlap(query_tokens: &[String], content_tokens: &[String]) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let hits = query_tokens
        .iter()
        .filter(|t| content_tokens.contains(t))
        .count();
    hits as f64 / query_tokens.len() as f64
}

/// TF-IDF relevance of one document against query tokens, over the given
/// corpus of tokenised documents. Raw (unnormalised) score.
pub fn tfidf_score(
    query_tokens: &[String],
    doc_tokens: &[String],
    corpus: &[Vec<String>],
) -> f64 {
    if query_tokens.is_empty() || doc_tokens.is_empty() || corpus.is_empty() {
        return 0.0;
    }
    let n = corpus.len() as f64;
    let mut score = 0.0;
    for term in query_tokens {
        let tf = doc_tokens.iter().filter(|t| *t == term).count() as f64
            / doc_tokens.len() as f64;
        if tf == 0.0 {
            continue;
        }
        let df = corpus.iter().filter(|d| d.contains(term)).count() as f64;
        let idf = (n / (1.0 + df)).ln() + 1.0;
        score += tf * idf;
    }
    score
}
