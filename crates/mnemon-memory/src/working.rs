// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working memory: bounded, TTL'd, purely in-process.
//!
//! Ranking blends TF-IDF over the live items, lexical keyword overlap,
//! time decay, and importance. With an empty query only decay and
//! importance contribute, which is also the eviction order.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::types::{MemoryItem, MemoryType};

use crate::ranking::{WORKING_TAU_SECS, keyword_overlap, recency, tfidf_score, tokenize};
use crate::store::{MemoryPatch, MemoryStore, ScoredItem, apply_patch, metadata_matches};

/// In-process working memory with capacity and TTL.
pub struct WorkingMemory {
    capacity: usize,
    ttl: Duration,
    items: RwLock<Vec<MemoryItem>>,
}

impl WorkingMemory {
    pub fn new(capacity: usize, ttl_minutes: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl: Duration::minutes(ttl_minutes as i64),
            items: RwLock::new(Vec::new()),
        }
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<MemoryItem>> {
        self.items.write().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, Vec<MemoryItem>> {
        self.items.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Drops expired items. Called lazily by every operation.
    fn expire(items: &mut Vec<MemoryItem>) {
        let now = Utc::now();
        items.retain(|item| !item.is_expired(now));
    }

    fn composite_scores(items: &[MemoryItem], query: &str) -> Vec<f64> {
        let now = Utc::now();
        let query_tokens = tokenize(query);
        let corpus: Vec<Vec<String>> = items.iter().map(|i| tokenize(&i.content)).collect();

        let raw_tfidf: Vec<f64> = corpus
            .iter()
            .map(|doc| tfidf_score(&query_tokens, doc, &corpus))
            .collect();
        let max_tfidf = raw_tfidf.iter().cloned().fold(0.0_f64, f64::max);

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let tfidf = if max_tfidf > 0.0 {
                    raw_tfidf[i] / max_tfidf
                } else {
                    0.0
                };
                let keyword = keyword_overlap(&query_tokens, &corpus[i]);
                let decay = recency(item.last_accessed_at, now, WORKING_TAU_SECS);
                0.4 * tfidf + 0.2 * keyword + 0.2 * decay + 0.2 * item.importance
            })
            .collect()
    }
}

#[async_trait]
impl MemoryStore for WorkingMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Working
    }

    async fn add(&self, mut item: MemoryItem) -> Result<String, MnemonError> {
        item.expires_at = Some(item.created_at + self.ttl);
        let id = item.id.clone();

        let mut items = self.lock_write();
        Self::expire(&mut items);
        items.push(item);

        if items.len() > self.capacity {
            let scores = Self::composite_scores(&items, "");
            let (victim, _) = scores
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .expect("non-empty by construction");
            let evicted = items.remove(victim);
            debug!(id = %evicted.id, importance = evicted.importance, "working memory evicted");
        }
        Ok(id)
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
        min_importance: f64,
    ) -> Result<Vec<ScoredItem>, MnemonError> {
        let mut items = self.lock_write();
        Self::expire(&mut items);

        let candidates: Vec<MemoryItem> = items
            .iter()
            .filter(|item| metadata_matches(item, filter))
            .cloned()
            .collect();
        drop(items);

        let scores = Self::composite_scores(&candidates, query);
        let mut scored: Vec<ScoredItem> = candidates
            .into_iter()
            .zip(scores)
            .map(|(item, score)| ScoredItem { item, score })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.retain(|s| s.item.importance >= min_importance);
        scored.truncate(k);

        // Record the access on the live items.
        let mut items = self.lock_write();
        for hit in &mut scored {
            if let Some(live) = items.iter_mut().find(|i| i.id == hit.item.id) {
                live.boost_access();
                hit.item = live.clone();
            }
        }
        Ok(scored)
    }

    async fn update(&self, id: &str, patch: MemoryPatch) -> Result<(), MnemonError> {
        let mut items = self.lock_write();
        Self::expire(&mut items);
        let Some(item) = items.iter_mut().find(|i| i.id == id) else {
            return Err(MnemonError::NotFound {
                kind: "memory item",
                id: id.to_string(),
            });
        };
        apply_patch(item, patch);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), MnemonError> {
        let mut items = self.lock_write();
        let before = items.len();
        items.retain(|i| i.id != id);
        if items.len() == before {
            return Err(MnemonError::NotFound {
                kind: "memory item",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn all(&self) -> Result<Vec<MemoryItem>, MnemonError> {
        let mut items = self.lock_write();
        Self::expire(&mut items);
        Ok(items.clone())
    }

    async fn clear(&self) -> Result<(), MnemonError> {
        self.lock_write().clear();
        Ok(())
    }
}
