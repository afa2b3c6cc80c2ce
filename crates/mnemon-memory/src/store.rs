// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared interface implemented by all four memory stores.

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::types::{MemoryItem, MemoryType};

/// A memory item with its ranking score for one search call.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: MemoryItem,
    pub score: f64,
}

/// Partial update applied by `MemoryStore::update`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub importance: Option<f64>,
    /// Keys merged into (not replacing) the item's metadata.
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// One memory store specialisation.
///
/// Stores are scoped to a single user; the manager owns one instance per
/// enabled type.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    fn memory_type(&self) -> MemoryType;

    /// Stores the item, returning its id.
    async fn add(&self, item: MemoryItem) -> Result<String, MnemonError>;

    /// Ranked search. An empty query ranks by recency and importance
    /// alone. `min_importance` filters after ranking.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
        min_importance: f64,
    ) -> Result<Vec<ScoredItem>, MnemonError>;

    /// Applies a partial update. Fails with `NotFound` when absent.
    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), MnemonError>;

    /// Removes an item. Fails with `NotFound` when absent.
    async fn remove(&self, id: &str) -> Result<(), MnemonError>;

    /// All live items, unranked.
    async fn all(&self) -> Result<Vec<MemoryItem>, MnemonError>;

    /// Drops every item in this store.
    async fn clear(&self) -> Result<(), MnemonError>;
}

/// Applies a patch to an item in place.
pub(crate) fn apply_patch(item: &mut MemoryItem, patch: MemoryPatch) {
    if let Some(content) = patch.content {
        item.content = content;
    }
    if let Some(importance) = patch.importance {
        item.importance = importance.clamp(0.0, 1.0);
    }
    if let Some(metadata) = patch.metadata {
        for (key, value) in metadata {
            item.metadata.insert(key, value);
        }
    }
}

/// True when the item's metadata carries every pair of `filter`.
pub(crate) fn metadata_matches(
    item: &MemoryItem,
    filter: Option<&serde_json::Map<String, Value>>,
) -> bool {
    filter.is_none_or(|f| {
        f.iter()
            .all(|(key, expected)| item.metadata.get(key) == Some(expected))
    })
}
