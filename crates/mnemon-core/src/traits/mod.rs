// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Mnemon core.
//!
//! Components depend on these narrow interfaces rather than concrete
//! backends; all use `#[async_trait]` for dynamic dispatch compatibility.

pub mod chat;
pub mod document;
pub mod embedding;
pub mod memory;
pub mod vector;

pub use chat::ChatClient;
pub use document::{DocumentFilter, DocumentStore};
pub use embedding::Embedder;
pub use memory::MemoryRecordStore;
pub use vector::VectorStore;
