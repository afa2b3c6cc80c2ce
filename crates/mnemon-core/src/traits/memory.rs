// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait backing the durable memory types.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::types::{GraphEdge, MemoryItem, MemoryType};

/// Durable storage for memory items and semantic graph edges.
///
/// Rows are tagged with their owning `user_id`; the memory manager owns
/// all rows for its user. Embeddings travel with the item.
#[async_trait]
pub trait MemoryRecordStore: Send + Sync {
    /// Inserts or replaces an item.
    async fn put_item(&self, item: &MemoryItem) -> Result<(), MnemonError>;

    /// Fetches an item by id, `None` when absent.
    async fn get_item(&self, id: &str) -> Result<Option<MemoryItem>, MnemonError>;

    /// Removes an item. Fails with `NotFound` when the id is absent.
    async fn delete_item(&self, id: &str) -> Result<(), MnemonError>;

    /// Lists items for a user, optionally restricted to one memory type.
    async fn list_items(
        &self,
        user_id: &str,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<MemoryItem>, MnemonError>;

    /// Records a semantic graph edge.
    async fn put_edge(&self, edge: &GraphEdge) -> Result<(), MnemonError>;

    /// Returns edges whose subject or object equals `concept`.
    async fn neighbors(&self, concept: &str) -> Result<Vec<GraphEdge>, MnemonError>;
}
