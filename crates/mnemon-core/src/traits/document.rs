// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store trait: durable KV+metadata storage for raw documents.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::types::{Document, FormatTag};

/// Filter for document listing.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub format_tag: Option<FormatTag>,
    pub source_uri_prefix: Option<String>,
}

/// Durable store for normalised documents.
///
/// Writes are atomic per document; `get` after `put` returns the written
/// record. No cross-document transactions are required.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts or replaces a document.
    async fn put(&self, doc: &Document) -> Result<(), MnemonError>;

    /// Fetches a document by id, `None` when absent.
    async fn get(&self, document_id: &str) -> Result<Option<Document>, MnemonError>;

    /// Removes a document. Fails with `NotFound` when the id is absent.
    async fn delete(&self, document_id: &str) -> Result<(), MnemonError>;

    /// Lists documents in a namespace, optionally filtered.
    async fn list(
        &self,
        namespace: &str,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, MnemonError>;
}
