// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory manager: one façade over the enabled memory stores for a
//! single user.
//!
//! Reads fan out to the stores directly; multi-step mutations
//! (consolidate, forget, clear_all) serialise behind a per-manager
//! write lock so concurrent runs for the same user cannot interleave
//! half-applied moves.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use mnemon_core::MnemonError;
use mnemon_core::tokens::count_tokens;
use mnemon_core::traits::{Embedder, MemoryRecordStore};
use mnemon_core::types::{MemoryItem, MemoryType};

use crate::episodic::EpisodicMemory;
use crate::perceptual::PerceptualMemory;
use crate::semantic::SemanticMemory;
use crate::store::{MemoryStore, ScoredItem};
use crate::working::WorkingMemory;

/// Importance multiplier applied when an item is promoted.
const CONSOLIDATION_BOOST: f64 = 1.1;

/// Forgetting strategies accepted by [`MemoryManager::forget`].
#[derive(Debug, Clone)]
pub enum ForgetStrategy {
    /// Remove items with `importance < threshold`.
    ImportanceBased { threshold: f64 },
    /// Remove items with `created_at < now - max_age`.
    AgeBased { max_age: Duration },
    /// Remove oldest by `last_accessed_at` until the total count is at
    /// most `target`.
    Lru { target: usize },
}

/// Aggregate statistics over all enabled stores.
#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub counts: BTreeMap<&'static str, usize>,
    pub total_items: usize,
    pub total_tokens: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

pub struct MemoryManager {
    user_id: String,
    stores: Vec<Arc<dyn MemoryStore>>,
    write_lock: Mutex<()>,
}

impl MemoryManager {
    /// Builds a manager over explicit store instances.
    pub fn new(user_id: impl Into<String>, stores: Vec<Arc<dyn MemoryStore>>) -> Self {
        Self {
            user_id: user_id.into(),
            stores,
            write_lock: Mutex::new(()),
        }
    }

    /// Builds a manager with the standard store per enabled type.
    pub fn with_stores(
        records: Arc<dyn MemoryRecordStore>,
        embedder: Arc<dyn Embedder>,
        user_id: impl Into<String>,
        enabled_types: &[MemoryType],
        working_capacity: usize,
        working_ttl_minutes: u64,
    ) -> Self {
        let user_id = user_id.into();
        let stores: Vec<Arc<dyn MemoryStore>> = MemoryType::all()
            .into_iter()
            .filter(|ty| enabled_types.contains(ty))
            .map(|ty| -> Arc<dyn MemoryStore> {
                match ty {
                    MemoryType::Working => {
                        Arc::new(WorkingMemory::new(working_capacity, working_ttl_minutes))
                    }
                    MemoryType::Episodic => Arc::new(EpisodicMemory::new(
                        records.clone(),
                        embedder.clone(),
                        user_id.clone(),
                    )),
                    MemoryType::Semantic => Arc::new(SemanticMemory::new(
                        records.clone(),
                        embedder.clone(),
                        user_id.clone(),
                    )),
                    MemoryType::Perceptual => Arc::new(PerceptualMemory::new(
                        records.clone(),
                        embedder.clone(),
                        user_id.clone(),
                    )),
                }
            })
            .collect();
        Self::new(user_id, stores)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn store_for(&self, ty: MemoryType) -> Result<&Arc<dyn MemoryStore>, MnemonError> {
        self.stores
            .iter()
            .find(|s| s.memory_type() == ty)
            .ok_or_else(|| {
                MnemonError::Config(format!("memory type {} is not enabled", ty.as_str()))
            })
    }

    /// Stores new content, returning the item id.
    pub async fn add(
        &self,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance: f64,
        metadata: serde_json::Map<String, Value>,
    ) -> Result<String, MnemonError> {
        let store = self.store_for(memory_type)?;
        let mut item = MemoryItem::new(&self.user_id, content, memory_type, importance);
        item.metadata = metadata;
        let id = store.add(item).await?;
        counter!("mnemon_memory_adds_total", "type" => memory_type.as_str()).increment(1);
        debug!(user_id = %self.user_id, %id, memory_type = memory_type.as_str(), "memory added");
        Ok(id)
    }

    /// Ranked search across one type, or all enabled types merged.
    pub async fn search(
        &self,
        query: &str,
        memory_type: Option<MemoryType>,
        k: usize,
        min_importance: f64,
    ) -> Result<Vec<MemoryItem>, MnemonError> {
        let mut scored: Vec<ScoredItem> = Vec::new();
        match memory_type {
            Some(ty) => {
                scored = self
                    .store_for(ty)?
                    .search(query, k, None, min_importance)
                    .await?;
            }
            None => {
                for store in &self.stores {
                    scored.extend(store.search(query, k, None, min_importance).await?);
                }
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        counter!("mnemon_memory_searches_total").increment(1);
        Ok(scored.into_iter().map(|s| s.item).collect())
    }

    /// Fetches an item by id from whichever store holds it.
    pub async fn get(&self, id: &str) -> Result<Option<MemoryItem>, MnemonError> {
        for store in &self.stores {
            if let Some(item) = store.all().await?.into_iter().find(|i| i.id == id) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Removes an item by id from whichever store holds it.
    pub async fn remove(&self, id: &str) -> Result<(), MnemonError> {
        for store in &self.stores {
            match store.remove(id).await {
                Ok(()) => return Ok(()),
                Err(MnemonError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(MnemonError::NotFound {
            kind: "memory item",
            id: id.to_string(),
        })
    }

    /// Human-readable digest: top-k per enabled type under short headers.
    pub async fn summary(&self, k: usize) -> Result<String, MnemonError> {
        let mut out = String::new();
        for store in &self.stores {
            let hits = store.search("", k, None, 0.0).await?;
            if hits.is_empty() {
                continue;
            }
            out.push_str(&format!("### {} memory\n", title(store.memory_type())));
            for hit in hits {
                out.push_str(&format!(
                    "- {} (importance {:.2})\n",
                    hit.item.content, hit.item.importance
                ));
            }
            out.push('\n');
        }
        Ok(out.trim_end().to_string())
    }

    /// Counts, token totals, and timestamp bounds across enabled stores.
    pub async fn stats(&self) -> Result<MemoryStats, MnemonError> {
        let mut counts = BTreeMap::new();
        let mut total_tokens = 0usize;
        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;

        for store in &self.stores {
            let items = store.all().await?;
            counts.insert(store.memory_type().as_str(), items.len());
            for item in &items {
                total_tokens += count_tokens(&item.content);
                oldest = Some(oldest.map_or(item.created_at, |o| o.min(item.created_at)));
                newest = Some(newest.map_or(item.created_at, |n| n.max(item.created_at)));
            }
        }
        Ok(MemoryStats {
            total_items: counts.values().sum(),
            counts,
            total_tokens,
            oldest,
            newest,
        })
    }

    /// Promotes items with `importance >= threshold` from one type to
    /// another, boosting importance by 10% (capped at 1.0) and stamping
    /// `consolidated_from`. Returns the number of items moved.
    pub async fn consolidate(
        &self,
        from: MemoryType,
        to: MemoryType,
        threshold: f64,
    ) -> Result<usize, MnemonError> {
        let _guard = self.write_lock.lock().await;
        let from_store = self.store_for(from)?;
        let to_store = self.store_for(to)?;

        let mut moved = 0usize;
        for item in from_store.all().await? {
            if item.importance < threshold {
                continue;
            }
            let mut promoted = MemoryItem::new(
                &self.user_id,
                item.content.clone(),
                to,
                (item.importance * CONSOLIDATION_BOOST).min(1.0),
            );
            promoted.metadata = item.metadata.clone();
            promoted
                .metadata
                .insert("consolidated_from".into(), json!(item.id));
            to_store.add(promoted).await?;
            from_store.remove(&item.id).await?;
            moved += 1;
        }
        counter!("mnemon_memory_consolidations_total").increment(moved as u64);
        info!(user_id = %self.user_id, from = from.as_str(), to = to.as_str(), moved, "consolidated");
        Ok(moved)
    }

    /// Applies a forgetting strategy across all enabled stores. Returns
    /// the number of items removed.
    pub async fn forget(&self, strategy: ForgetStrategy) -> Result<usize, MnemonError> {
        let _guard = self.write_lock.lock().await;
        let mut removed = 0usize;

        match strategy {
            ForgetStrategy::ImportanceBased { threshold } => {
                for store in &self.stores {
                    for item in store.all().await? {
                        if item.importance < threshold {
                            store.remove(&item.id).await?;
                            removed += 1;
                        }
                    }
                }
            }
            ForgetStrategy::AgeBased { max_age } => {
                let cutoff = Utc::now() - max_age;
                for store in &self.stores {
                    for item in store.all().await? {
                        if item.created_at < cutoff {
                            store.remove(&item.id).await?;
                            removed += 1;
                        }
                    }
                }
            }
            ForgetStrategy::Lru { target } => {
                let mut all: Vec<(usize, MemoryItem)> = Vec::new();
                for (idx, store) in self.stores.iter().enumerate() {
                    all.extend(store.all().await?.into_iter().map(|i| (idx, i)));
                }
                if all.len() > target {
                    all.sort_by_key(|(_, item)| item.last_accessed_at);
                    let excess = all.len() - target;
                    for (idx, item) in all.into_iter().take(excess) {
                        self.stores[idx].remove(&item.id).await?;
                        removed += 1;
                    }
                }
            }
        }
        counter!("mnemon_memory_forgotten_total").increment(removed as u64);
        Ok(removed)
    }

    /// Drops everything in every enabled store.
    pub async fn clear_all(&self) -> Result<(), MnemonError> {
        let _guard = self.write_lock.lock().await;
        for store in &self.stores {
            store.clear().await?;
        }
        info!(user_id = %self.user_id, "all memory cleared");
        Ok(())
    }
}

fn title(ty: MemoryType) -> &'static str {
    match ty {
        MemoryType::Working => "Working",
        MemoryType::Episodic => "Episodic",
        MemoryType::Semantic => "Semantic",
        MemoryType::Perceptual => "Perceptual",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;

    fn manager_with_capacity(capacity: usize) -> MemoryManager {
        MemoryManager::with_stores(
            Arc::new(MemStore::new()),
            Arc::new(HashEmbedder::new(64)),
            "u1",
            &MemoryType::all(),
            capacity,
            60,
        )
    }

    fn manager() -> MemoryManager {
        manager_with_capacity(50)
    }

    fn no_meta() -> serde_json::Map<String, Value> {
        serde_json::Map::new()
    }

    #[tokio::test]
    async fn add_then_remove_restores_stats() {
        let manager = manager();
        let before = manager.stats().await.unwrap();

        let id = manager
            .add("temp fact", MemoryType::Working, 0.5, no_meta())
            .await
            .unwrap();
        manager.remove(&id).await.unwrap();

        let after = manager.stats().await.unwrap();
        assert_eq!(before.total_items, after.total_items);
        assert_eq!(before.total_tokens, after.total_tokens);
    }

    #[tokio::test]
    async fn identical_content_gets_distinct_ids() {
        let manager = manager();
        let a = manager
            .add("same", MemoryType::Semantic, 0.5, no_meta())
            .await
            .unwrap();
        let b = manager
            .add("same", MemoryType::Semantic, 0.5, no_meta())
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.stats().await.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn working_capacity_evicts_least_valuable() {
        let manager = manager_with_capacity(3);
        for importance in [0.9, 0.8, 0.7, 0.1] {
            manager
                .add(
                    format!("item {importance}"),
                    MemoryType::Working,
                    importance,
                    no_meta(),
                )
                .await
                .unwrap();
        }

        let hits = manager
            .search("", Some(MemoryType::Working), 10, 0.0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|i| i.content != "item 0.1"));
    }

    #[tokio::test]
    async fn consolidation_moves_and_boosts() {
        let manager = manager();
        for importance in [0.9, 0.7, 0.3] {
            manager
                .add(
                    format!("fact {importance}"),
                    MemoryType::Working,
                    importance,
                    no_meta(),
                )
                .await
                .unwrap();
        }

        let moved = manager
            .consolidate(MemoryType::Working, MemoryType::Episodic, 0.6)
            .await
            .unwrap();
        assert_eq!(moved, 2);

        let working = manager
            .search("", Some(MemoryType::Working), 10, 0.0)
            .await
            .unwrap();
        assert_eq!(working.len(), 1);
        // Allow for the +0.01 access boost applied by the search itself.
        assert!((working[0].importance - 0.3).abs() < 0.011);

        let episodic = manager
            .search("", Some(MemoryType::Episodic), 10, 0.0)
            .await
            .unwrap();
        assert_eq!(episodic.len(), 2);
        let mut importances: Vec<f64> = episodic.iter().map(|i| i.importance).collect();
        importances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((importances[0] - 0.77).abs() < 0.011);
        assert!((importances[1] - 0.99).abs() < 0.011);
        for item in &episodic {
            assert!(item.metadata.contains_key("consolidated_from"));
        }

        // No item above the threshold remains in the source.
        assert!(working.iter().all(|i| i.importance < 0.6));
        assert_eq!(manager.stats().await.unwrap().total_items, 3);
    }

    #[tokio::test]
    async fn forget_importance_based() {
        let manager = manager();
        manager
            .add("trivia", MemoryType::Semantic, 0.1, no_meta())
            .await
            .unwrap();
        manager
            .add("crucial", MemoryType::Semantic, 0.9, no_meta())
            .await
            .unwrap();

        let removed = manager
            .forget(ForgetStrategy::ImportanceBased { threshold: 0.5 })
            .await
            .unwrap();
        assert_eq!(removed, 1);
        let remaining = manager
            .search("", Some(MemoryType::Semantic), 10, 0.0)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "crucial");
    }

    #[tokio::test]
    async fn forget_lru_keeps_target_count() {
        let manager = manager();
        for i in 0..5 {
            manager
                .add(format!("e{i}"), MemoryType::Episodic, 0.5, no_meta())
                .await
                .unwrap();
        }
        let removed = manager
            .forget(ForgetStrategy::Lru { target: 2 })
            .await
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(manager.stats().await.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn disabled_type_is_a_config_error() {
        let manager = MemoryManager::with_stores(
            Arc::new(MemStore::new()),
            Arc::new(HashEmbedder::new(64)),
            "u1",
            &[MemoryType::Working],
            50,
            60,
        );
        let err = manager
            .add("x", MemoryType::Semantic, 0.5, no_meta())
            .await
            .unwrap_err();
        assert!(matches!(err, MnemonError::Config(_)));
    }

    #[tokio::test]
    async fn summary_has_type_headers() {
        let manager = manager();
        manager
            .add("remember the milk", MemoryType::Working, 0.8, no_meta())
            .await
            .unwrap();
        manager
            .add("paris is in france", MemoryType::Semantic, 0.9, no_meta())
            .await
            .unwrap();

        let summary = manager.summary(3).await.unwrap();
        assert!(summary.contains("### Working memory"));
        assert!(summary.contains("### Semantic memory"));
        assert!(summary.contains("remember the milk"));
    }

    #[tokio::test]
    async fn clear_all_empties_every_store() {
        let manager = manager();
        manager
            .add("a", MemoryType::Working, 0.5, no_meta())
            .await
            .unwrap();
        manager
            .add("b", MemoryType::Episodic, 0.5, no_meta())
            .await
            .unwrap();
        manager.clear_all().await.unwrap();
        assert_eq!(manager.stats().await.unwrap().total_items, 0);
    }
}
