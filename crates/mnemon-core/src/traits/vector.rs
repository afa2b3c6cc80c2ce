// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector store trait: namespace-scoped similarity index.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MnemonError;
use crate::types::SearchHit;

/// Namespace-scoped similarity index.
///
/// Scores are cosine similarity; results come back in descending score
/// order. Searching an empty namespace returns `[]` without error.
/// Vector dimensionality is fixed per namespace at first upsert.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces a vector with its payload.
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: &[f32],
        payload: Value,
    ) -> Result<(), MnemonError>;

    /// Returns the top-k nearest entries, filtered by payload equality
    /// when a filter is given.
    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Vec<SearchHit>, MnemonError>;

    /// Removes an entry if present.
    async fn delete(&self, namespace: &str, id: &str) -> Result<(), MnemonError>;
}

/// True when `payload` carries every key/value pair of `filter`.
pub fn payload_matches(payload: &Value, filter: &serde_json::Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| payload.get(key) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_matches_subset() {
        let payload = json!({"session_id": "s1", "event_type": "login", "n": 3});
        let mut filter = serde_json::Map::new();
        filter.insert("session_id".into(), json!("s1"));
        assert!(payload_matches(&payload, &filter));

        filter.insert("event_type".into(), json!("logout"));
        assert!(!payload_matches(&payload, &filter));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let payload = json!({"a": 1});
        assert!(payload_matches(&payload, &serde_json::Map::new()));
    }
}
