// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic memory: durable concept knowledge with an optional
//! entity/relation graph.
//!
//! Items carrying `subject`/`predicate`/`object` metadata also record a
//! graph edge with the item id as provenance. When a query mentions a
//! known concept, 1-hop graph neighbours join the result set at a 0.8x
//! score penalty.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::traits::{Embedder, MemoryRecordStore};
use mnemon_core::types::{GraphEdge, MemoryItem, MemoryType};

use crate::durable::DurableCore;
use crate::store::{MemoryPatch, MemoryStore, ScoredItem};

/// Penalty applied to hits reached only through the graph.
const GRAPH_PENALTY: f64 = 0.8;

pub struct SemanticMemory {
    core: DurableCore,
}

impl SemanticMemory {
    pub fn new(
        records: Arc<dyn MemoryRecordStore>,
        embedder: Arc<dyn Embedder>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            core: DurableCore::new(records, embedder, user_id, MemoryType::Semantic),
        }
    }

    /// Concepts mentioned in the query: for every known concept among
    /// stored items, check whether the query contains it.
    async fn mentioned_concepts(&self, query: &str) -> Result<Vec<String>, MnemonError> {
        let query_lower = query.to_lowercase();
        let mut concepts: HashSet<String> = HashSet::new();
        for item in self.core.all().await? {
            for key in ["concept", "subject", "object"] {
                if let Some(value) = item.metadata.get(key).and_then(Value::as_str) {
                    if query_lower.contains(&value.to_lowercase()) {
                        concepts.insert(value.to_string());
                    }
                }
            }
        }
        Ok(concepts.into_iter().collect())
    }
}

#[async_trait]
impl MemoryStore for SemanticMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Semantic
    }

    async fn add(&self, item: MemoryItem) -> Result<String, MnemonError> {
        let edge = extract_edge(&item);
        let id = self.core.add(item).await?;
        if let Some(mut edge) = edge {
            edge.provenance = id.clone();
            debug!(subject = %edge.subject, object = %edge.object, "semantic edge recorded");
            self.core.records.put_edge(&edge).await?;
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
        let mut hits = self.core.search(query, k, filter, min_importance).await?;
        if query.is_empty() {
            return Ok(hits);
        }

        // Graph expansion: items asserting edges around mentioned concepts.
        let seen: HashSet<String> = hits.iter().map(|h| h.item.id.clone()).collect();
        let mut extra: Vec<ScoredItem> = Vec::new();
        for concept in self.mentioned_concepts(query).await? {
            for edge in self.core.records.neighbors(&concept).await? {
                if seen.contains(&edge.provenance)
                    || extra.iter().any(|s| s.item.id == edge.provenance)
                {
                    continue;
                }
                if let Some(item) = self.core.records.get_item(&edge.provenance).await? {
                    if item.user_id != self.core.user_id || item.importance < min_importance {
                        continue;
                    }
                    let base = hits.last().map_or(0.5, |h| h.score);
                    extra.push(ScoredItem {
                        score: base * GRAPH_PENALTY,
                        item,
                    });
                }
            }
        }
        hits.extend(extra);
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
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

/// Builds a graph edge from subject/predicate/object metadata, if all
/// three are present.
fn extract_edge(item: &MemoryItem) -> Option<GraphEdge> {
    let get = |key: &str| item.metadata.get(key).and_then(Value::as_str);
    match (get("subject"), get("predicate"), get("object")) {
        (Some(subject), Some(predicate), Some(object)) => Some(GraphEdge {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            provenance: item.id.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;
    use serde_json::json;

    fn memory() -> SemanticMemory {
        SemanticMemory::new(
            Arc::new(MemStore::new()),
            Arc::new(HashEmbedder::new(64)),
            "u1",
        )
    }

    fn fact(content: &str, triple: Option<(&str, &str, &str)>) -> MemoryItem {
        let mut item = MemoryItem::new("u1", content, MemoryType::Semantic, 0.6);
        if let Some((s, p, o)) = triple {
            item.metadata.insert("subject".into(), json!(s));
            item.metadata.insert("predicate".into(), json!(p));
            item.metadata.insert("object".into(), json!(o));
        }
        item
    }

    #[tokio::test]
    async fn add_with_triple_records_edge() {
        let records = Arc::new(MemStore::new());
        let memory = SemanticMemory::new(records.clone(), Arc::new(HashEmbedder::new(64)), "u1");
        let id = memory
            .add(fact(
                "deep learning is a subset of machine learning",
                Some(("deep learning", "subset_of", "machine learning")),
            ))
            .await
            .unwrap();

        use mnemon_core::traits::MemoryRecordStore;
        let edges = records.neighbors("machine learning").await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].provenance, id);
    }

    #[tokio::test]
    async fn graph_neighbours_join_results_with_penalty() {
        let memory = memory();
        memory
            .add(fact(
                "cnns are convolutional networks",
                Some(("cnn", "kind_of", "neural network")),
            ))
            .await
            .unwrap();
        memory
            .add(fact(
                "transformers use attention",
                Some(("transformer", "kind_of", "neural network")),
            ))
            .await
            .unwrap();

        // Query mentions "neural network": both edge provenances qualify.
        let hits = memory
            .search("what is a neural network", 10, None, 0.0)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn plain_facts_skip_graph() {
        let memory = memory();
        memory.add(fact("water boils at 100 celsius", None)).await.unwrap();
        let hits = memory.search("boiling point of water", 5, None, 0.0).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
