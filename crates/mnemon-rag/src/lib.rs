// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented generation pipeline: format normalisation,
//! Markdown-aware chunking, ingestion, and similarity retrieval with
//! optional query expansion and hypothetical document embeddings.

pub mod chunker;
pub mod ingest;
pub mod normalize;
pub mod retriever;

pub use chunker::Chunker;
pub use ingest::DocumentIngestor;
pub use normalize::{detect_format, to_markdown};
pub use retriever::{RetrievedChunk, Retriever, SearchOptions};
