// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementing all three storage traits. Used in tests
//! and for ephemeral runs where nothing should touch disk.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::traits::vector::payload_matches;
use mnemon_core::traits::{DocumentFilter, DocumentStore, MemoryRecordStore, VectorStore};
use mnemon_core::types::{
    Document, GraphEdge, MemoryItem, MemoryType, SearchHit, cosine_similarity,
};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Document>,
    // namespace -> id -> (vector, payload)
    vectors: HashMap<String, HashMap<String, (Vec<f32>, Value)>>,
    namespace_dims: HashMap<String, usize>,
    memory_items: HashMap<String, MemoryItem>,
    edges: Vec<GraphEdge>,
}

/// Volatile store backed by `HashMap`s behind a `RwLock`.
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn put(&self, doc: &Document) -> Result<(), MnemonError> {
        self.write()
            .documents
            .insert(doc.document_id.clone(), doc.clone());
        Ok(())
    }

    async fn get(&self, document_id: &str) -> Result<Option<Document>, MnemonError> {
        Ok(self.read().documents.get(document_id).cloned())
    }

    async fn delete(&self, document_id: &str) -> Result<(), MnemonError> {
        let mut inner = self.write();
        if inner.documents.remove(document_id).is_none() {
            return Err(MnemonError::NotFound {
                kind: "document",
                id: document_id.to_string(),
            });
        }
        for entries in inner.vectors.values_mut() {
            entries.retain(|_, (_, payload)| {
                payload.get("document_id").and_then(Value::as_str) != Some(document_id)
            });
        }
        Ok(())
    }

    async fn list(
        &self,
        namespace: &str,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, MnemonError> {
        let inner = self.read();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|doc| doc.namespace == namespace)
            .filter(|doc| {
                filter.is_none_or(|f| {
                    f.format_tag.is_none_or(|tag| doc.format_tag == tag)
                        && f.source_uri_prefix
                            .as_deref()
                            .is_none_or(|prefix| doc.source_uri.starts_with(prefix))
                })
            })
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        Ok(docs)
    }
}

#[async_trait]
impl VectorStore for MemStore {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: &[f32],
        payload: Value,
    ) -> Result<(), MnemonError> {
        let mut inner = self.write();
        match inner.namespace_dims.get(namespace) {
            Some(&dims) if dims != vector.len() => {
                return Err(MnemonError::Internal(format!(
                    "vector dimension mismatch: namespace is fixed at {dims}, got {}",
                    vector.len()
                )));
            }
            Some(_) => {}
            None => {
                inner
                    .namespace_dims
                    .insert(namespace.to_string(), vector.len());
            }
        }
        inner
            .vectors
            .entry(namespace.to_string())
            .or_default()
            .insert(id.to_string(), (vector.to_vec(), payload));
        Ok(())
    }

    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Vec<SearchHit>, MnemonError> {
        let inner = self.read();
        let Some(entries) = inner.vectors.get(namespace) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<SearchHit> = entries
            .iter()
            .filter(|(_, (_, payload))| filter.is_none_or(|f| payload_matches(payload, f)))
            .map(|(id, (candidate, payload))| SearchHit {
                id: id.clone(),
                score: cosine_similarity(vector, candidate),
                payload: payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, namespace: &str, id: &str) -> Result<(), MnemonError> {
        if let Some(entries) = self.write().vectors.get_mut(namespace) {
            entries.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryRecordStore for MemStore {
    async fn put_item(&self, item: &MemoryItem) -> Result<(), MnemonError> {
        self.write().memory_items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn get_item(&self, id: &str) -> Result<Option<MemoryItem>, MnemonError> {
        Ok(self.read().memory_items.get(id).cloned())
    }

    async fn delete_item(&self, id: &str) -> Result<(), MnemonError> {
        if self.write().memory_items.remove(id).is_none() {
            return Err(MnemonError::NotFound {
                kind: "memory item",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn list_items(
        &self,
        user_id: &str,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<MemoryItem>, MnemonError> {
        let inner = self.read();
        let mut items: Vec<MemoryItem> = inner
            .memory_items
            .values()
            .filter(|item| item.user_id == user_id)
            .filter(|item| memory_type.is_none_or(|ty| item.memory_type == ty))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn put_edge(&self, edge: &GraphEdge) -> Result<(), MnemonError> {
        let mut inner = self.write();
        if !inner.edges.contains(edge) {
            inner.edges.push(edge.clone());
        }
        Ok(())
    }

    async fn neighbors(&self, concept: &str) -> Result<Vec<GraphEdge>, MnemonError> {
        Ok(self
            .read()
            .edges
            .iter()
            .filter(|edge| edge.subject == concept || edge.object == concept)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mnemon_core::types::FormatTag;
    use serde_json::json;

    #[tokio::test]
    async fn document_delete_removes_chunks() {
        let store = MemStore::new();
        store
            .put(&Document {
                document_id: "doc-1".into(),
                namespace: "kb".into(),
                source_uri: "file:///a.md".into(),
                format_tag: FormatTag::Md,
                markdown: "# a".into(),
                ingested_at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .upsert("kb", "c1", &[1.0, 0.0], json!({"document_id": "doc-1"}))
            .await
            .unwrap();

        DocumentStore::delete(&store, "doc-1").await.unwrap();
        assert!(store.search("kb", &[1.0, 0.0], 10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_respects_k_and_order() {
        let store = MemStore::new();
        store.upsert("ns", "a", &[1.0, 0.0], json!({})).await.unwrap();
        store.upsert("ns", "b", &[0.5, 0.5], json!({})).await.unwrap();
        store.upsert("ns", "c", &[0.0, 1.0], json!({})).await.unwrap();

        let hits = store.search("ns", &[1.0, 0.0], 2, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let store = MemStore::new();
        store.upsert("ns", "a", &[1.0, 0.0, 0.0], json!({})).await.unwrap();
        assert!(store.upsert("ns", "b", &[1.0], json!({})).await.is_err());
    }

    #[tokio::test]
    async fn memory_items_scoped_by_user() {
        let store = MemStore::new();
        store
            .put_item(&MemoryItem::new("u1", "a", MemoryType::Working, 0.5))
            .await
            .unwrap();
        store
            .put_item(&MemoryItem::new("u2", "b", MemoryType::Working, 0.5))
            .await
            .unwrap();

        let items = store.list_items("u1", None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "a");
    }

    #[tokio::test]
    async fn duplicate_edges_collapse() {
        let store = MemStore::new();
        let edge = GraphEdge {
            subject: "a".into(),
            predicate: "rel".into(),
            object: "b".into(),
            provenance: "m1".into(),
        };
        store.put_edge(&edge).await.unwrap();
        store.put_edge(&edge).await.unwrap();
        assert_eq!(store.neighbors("a").await.unwrap().len(), 1);
    }
}
