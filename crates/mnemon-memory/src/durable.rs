// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared behaviour of the durable memory stores: record persistence,
//! embedding at add time, and vector-first ranked search.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::traits::{Embedder, MemoryRecordStore};
use mnemon_core::types::{MemoryItem, MemoryType, cosine_similarity};

use crate::ranking::{DURABLE_TAU_SECS, durable_score, recency};
use crate::store::{MemoryPatch, ScoredItem, apply_patch, metadata_matches};

/// Embeds, persists, and ranks durable memory items for one user and
/// one memory type.
pub(crate) struct DurableCore {
    pub records: Arc<dyn MemoryRecordStore>,
    pub embedder: Arc<dyn Embedder>,
    pub user_id: String,
    pub memory_type: MemoryType,
}

impl DurableCore {
    pub fn new(
        records: Arc<dyn MemoryRecordStore>,
        embedder: Arc<dyn Embedder>,
        user_id: impl Into<String>,
        memory_type: MemoryType,
    ) -> Self {
        Self {
            records,
            embedder,
            user_id: user_id.into(),
            memory_type,
        }
    }

    pub async fn add(&self, mut item: MemoryItem) -> Result<String, MnemonError> {
        item.memory_type = self.memory_type;
        item.user_id = self.user_id.clone();
        if item.embedding.is_none() {
            let vectors = self.embedder.embed(&[item.content.clone()]).await?;
            item.embedding = vectors.into_iter().next();
        }
        let id = item.id.clone();
        self.records.put_item(&item).await?;
        Ok(id)
    }

    /// Vector-first ranked search over this user's items of this type.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
        min_importance: f64,
    ) -> Result<Vec<ScoredItem>, MnemonError> {
        let items = self
            .records
            .list_items(&self.user_id, Some(self.memory_type))
            .await?;
        let candidates: Vec<MemoryItem> = items
            .into_iter()
            .filter(|item| metadata_matches(item, filter))
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = if query.is_empty() {
            None
        } else {
            Some(self.embedder.embed(&[query.to_string()]).await?.remove(0))
        };

        let now = Utc::now();
        let mut scored: Vec<ScoredItem> = candidates
            .into_iter()
            .map(|item| {
                let similarity = match (&query_vector, &item.embedding) {
                    (Some(q), Some(e)) => f64::from(cosine_similarity(q, e)).clamp(0.0, 1.0),
                    _ => 0.0,
                };
                let decay = recency(item.last_accessed_at, now, DURABLE_TAU_SECS);
                let score = durable_score(similarity, item.importance, decay);
                ScoredItem { item, score }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.retain(|s| s.item.importance >= min_importance);
        scored.truncate(k);

        // Persist the access boost on returned items.
        for hit in &mut scored {
            hit.item.boost_access();
            self.records.put_item(&hit.item).await?;
        }
        Ok(scored)
    }

    pub async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), MnemonError> {
        let Some(mut item) = self.records.get_item(id).await? else {
            return Err(MnemonError::NotFound {
                kind: "memory item",
                id: id.to_string(),
            });
        };
        let content_changed = patch.content.is_some();
        apply_patch(&mut item, patch);
        if content_changed {
            let vectors = self.embedder.embed(&[item.content.clone()]).await?;
            item.embedding = vectors.into_iter().next();
        }
        self.records.put_item(&item).await
    }

    pub async fn remove(&self, id: &str) -> Result<(), MnemonError> {
        // Guard ownership: ids from other users or types are invisible.
        match self.records.get_item(id).await? {
            Some(item) if item.user_id == self.user_id && item.memory_type == self.memory_type => {
                self.records.delete_item(id).await
            }
            _ => Err(MnemonError::NotFound {
                kind: "memory item",
                id: id.to_string(),
            }),
        }
    }

    pub async fn all(&self) -> Result<Vec<MemoryItem>, MnemonError> {
        self.records
            .list_items(&self.user_id, Some(self.memory_type))
            .await
    }

    pub async fn clear(&self) -> Result<(), MnemonError> {
        for item in self.all().await? {
            self.records.delete_item(&item.id).await?;
        }
        Ok(())
    }
}
