// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Perceptual memory: durable per-modality descriptions.
//!
//! `content` holds a textual description of the percept; `modality`
//! metadata (image, audio, text, ...) partitions the store. Search is
//! intra-modality only: without a joint embedding space, cross-modal
//! similarity is not meaningful.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use mnemon_core::MnemonError;
use mnemon_core::traits::{Embedder, MemoryRecordStore};
use mnemon_core::types::{MemoryItem, MemoryType};

use crate::durable::DurableCore;
use crate::store::{MemoryPatch, MemoryStore, ScoredItem};

const DEFAULT_MODALITY: &str = "text";

pub struct PerceptualMemory {
    core: DurableCore,
}

impl PerceptualMemory {
    pub fn new(
        records: Arc<dyn MemoryRecordStore>,
        embedder: Arc<dyn Embedder>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            core: DurableCore::new(records, embedder, user_id, MemoryType::Perceptual),
        }
    }
}

#[async_trait]
impl MemoryStore for PerceptualMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Perceptual
    }

    async fn add(&self, mut item: MemoryItem) -> Result<String, MnemonError> {
        if !item.metadata.contains_key("modality") {
            item.metadata
                .insert("modality".into(), json!(DEFAULT_MODALITY));
        }
        self.core.add(item).await
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
        min_importance: f64,
    ) -> Result<Vec<ScoredItem>, MnemonError> {
        // Pin the search to one modality; callers that do not specify
        // one search the textual partition.
        let mut effective = filter.cloned().unwrap_or_default();
        effective
            .entry("modality".to_string())
            .or_insert_with(|| json!(DEFAULT_MODALITY));
        self.core
            .search(query, k, Some(&effective), min_importance)
            .await
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), MnemonError> {
        self.core.update(id, patch).await
    }

    async fn remove(&self, id: &str) -> Result<(), MnemonError> {
        self.core.remove(id).await
    }

    async fn all(&self) -> Result<Vec<MemoryItem>, MnemonError> {
        self.core.all().await
    }

    async fn clear(&self) -> Result<(), MnemonError> {
        self.core.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;

    fn memory() -> PerceptualMemory {
        PerceptualMemory::new(
            Arc::new(MemStore::new()),
            Arc::new(HashEmbedder::new(64)),
            "u1",
        )
    }

    fn percept(content: &str, modality: &str) -> MemoryItem {
        let mut item = MemoryItem::new("u1", content, MemoryType::Perceptual, 0.5);
        item.metadata.insert("modality".into(), json!(modality));
        item
    }

    #[tokio::test]
    async fn search_is_intra_modality() {
        let memory = memory();
        memory
            .add(percept("a red square logo on white background", "image"))
            .await
            .unwrap();
        memory
            .add(percept("a red square logo on white background", "text"))
            .await
            .unwrap();

        let mut filter = serde_json::Map::new();
        filter.insert("modality".into(), json!("image"));
        let hits = memory
            .search("red logo", 10, Some(&filter), 0.0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.metadata.get("modality"), Some(&json!("image")));
    }

    #[tokio::test]
    async fn default_modality_is_text() {
        let memory = memory();
        let mut item = MemoryItem::new("u1", "a low hum from the server rack", MemoryType::Perceptual, 0.5);
        item.metadata.clear();
        memory.add(item).await.unwrap();

        // Unfiltered search hits the text partition.
        let hits = memory.search("server hum", 10, None, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.metadata.get("modality"), Some(&json!("text")));
    }
}
