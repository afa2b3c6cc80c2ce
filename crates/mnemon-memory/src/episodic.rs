// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Episodic memory: durable event records carrying session context.
//!
//! Items record `session_id`, `event_type`, and optionally `location`
//! in metadata; search is vector-first with metadata equality filters.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::traits::{Embedder, MemoryRecordStore};
use mnemon_core::types::{MemoryItem, MemoryType};

use crate::durable::DurableCore;
use crate::store::{MemoryPatch, MemoryStore, ScoredItem};

pub struct EpisodicMemory {
    core: DurableCore,
}

impl EpisodicMemory {
    pub fn new(
        records: Arc<dyn MemoryRecordStore>,
        embedder: Arc<dyn Embedder>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            core: DurableCore::new(records, embedder, user_id, MemoryType::Episodic),
        }
    }
}

#[async_trait]
impl MemoryStore for EpisodicMemory {
    fn memory_type(&self) -> MemoryType {
        MemoryType::Episodic
    }

    async fn add(&self, item: MemoryItem) -> Result<String, MnemonError> {
        self.core.add(item).await
    }

    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
        min_importance: f64,
    ) -> Result<Vec<ScoredItem>, MnemonError> {
        self.core.search(query, k, filter, min_importance).await
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
