// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document ingestion pipeline: detect, normalise, chunk, embed, index.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use mnemon_core::MnemonError;
use mnemon_core::traits::{DocumentStore, Embedder, VectorStore};
use mnemon_core::types::Document;

use crate::chunker::Chunker;
use crate::normalize::{detect_format, to_markdown};

/// Ingests raw documents into a namespace: normalised body to the
/// document store, embedded chunks to the vector index.
pub struct DocumentIngestor {
    documents: Arc<dyn DocumentStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
}

impl DocumentIngestor {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            documents,
            vectors,
            embedder,
            chunker: Chunker::new(chunk_size, chunk_overlap),
        }
    }

    /// Runs the full pipeline on raw bytes. On any failure after chunks
    /// were indexed, the already-upserted chunk ids are rolled back.
    pub async fn ingest(
        &self,
        bytes: &[u8],
        source_uri: &str,
        namespace: &str,
    ) -> Result<Document, MnemonError> {
        let tag = detect_format(source_uri, bytes)?;
        let markdown = to_markdown(tag, bytes)?;
        debug!(%source_uri, %namespace, format = %tag, bytes = bytes.len(), "ingesting");

        let document_id = Uuid::new_v4().to_string();
        let mut chunks = self.chunker.chunk(&document_id, namespace, &markdown);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(MnemonError::Internal(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
        }

        let document = Document {
            document_id: document_id.clone(),
            namespace: namespace.to_string(),
            source_uri: source_uri.to_string(),
            format_tag: tag,
            markdown,
            ingested_at: Utc::now(),
        };

        let mut upserted: Vec<String> = Vec::new();
        let result = self.index_chunks(&document, &chunks, &mut upserted).await;
        if let Err(e) = result {
            warn!(%document_id, error = %e, "ingest failed, rolling back chunks");
            for id in &upserted {
                if let Err(del) = self.vectors.delete(namespace, id).await {
                    warn!(chunk_id = %id, error = %del, "rollback delete failed");
                }
            }
            return Err(e);
        }

        counter!("mnemon_documents_ingested_total").increment(1);
        counter!("mnemon_chunks_indexed_total").increment(chunks.len() as u64);
        info!(%document_id, %namespace, chunks = chunks.len(), "document ingested");
        Ok(document)
    }

    /// Convenience wrapper for already-textual input.
    pub async fn ingest_text(
        &self,
        text: &str,
        source_uri: &str,
        namespace: &str,
    ) -> Result<Document, MnemonError> {
        self.ingest(text.as_bytes(), source_uri, namespace).await
    }

    async fn index_chunks(
        &self,
        document: &Document,
        chunks: &[mnemon_core::types::DocumentChunk],
        upserted: &mut Vec<String>,
    ) -> Result<(), MnemonError> {
        for chunk in chunks {
            let embedding = chunk
                .embedding
                .as_ref()
                .ok_or_else(|| MnemonError::Internal("chunk missing embedding".into()))?;
            let payload = json!({
                "document_id": chunk.document_id,
                "ordinal": chunk.ordinal,
                "text": chunk.text,
                "heading_path": chunk.heading_path,
                "ingested_at": document.ingested_at.to_rfc3339(),
            });
            self.vectors
                .upsert(&document.namespace, &chunk.chunk_id, embedding, payload)
                .await?;
            upserted.push(chunk.chunk_id.clone());
        }
        self.documents.put(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mnemon_core::types::FormatTag;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;

    fn ingestor(store: Arc<MemStore>) -> DocumentIngestor {
        DocumentIngestor::new(
            store.clone(),
            store,
            Arc::new(HashEmbedder::new(64)),
            64,
            8,
        )
    }

    #[tokio::test]
    async fn ingest_markdown_indexes_chunks() {
        let store = Arc::new(MemStore::new());
        let ingestor = ingestor(store.clone());

        let doc = ingestor
            .ingest_text(
                "# Intro\n\nHello world.\n\n## More\n\nDetails here.",
                "file:///guide.md",
                "kb1",
            )
            .await
            .unwrap();
        assert_eq!(doc.format_tag, FormatTag::Md);

        let stored = store.get(&doc.document_id).await.unwrap().unwrap();
        assert_eq!(stored.namespace, "kb1");

        let embedder = HashEmbedder::new(64);
        let query = embedder.embed(&["hello world".into()]).await.unwrap();
        let hits = store.search("kb1", &query[0], 5, None).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(
            hits[0].payload.get("document_id").unwrap().as_str().unwrap(),
            doc.document_id
        );
    }

    #[tokio::test]
    async fn unsupported_format_fails_before_any_write() {
        let store = Arc::new(MemStore::new());
        let ingestor = ingestor(store.clone());

        let err = ingestor
            .ingest(b"%PDF-1.4 binary", "file:///paper.pdf", "kb1")
            .await
            .unwrap_err();
        assert!(matches!(err, MnemonError::UnsupportedFormat(_)));
        assert!(store.list("kb1", None).await.unwrap().is_empty());
    }

    struct FailingDocStore;

    #[async_trait]
    impl DocumentStore for FailingDocStore {
        async fn put(&self, _doc: &Document) -> Result<(), MnemonError> {
            Err(MnemonError::Internal("disk full".into()))
        }
        async fn get(&self, _id: &str) -> Result<Option<Document>, MnemonError> {
            Ok(None)
        }
        async fn delete(&self, _id: &str) -> Result<(), MnemonError> {
            Ok(())
        }
        async fn list(
            &self,
            _namespace: &str,
            _filter: Option<&mnemon_core::traits::DocumentFilter>,
        ) -> Result<Vec<Document>, MnemonError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn document_store_failure_rolls_back_chunks() {
        let vectors = Arc::new(MemStore::new());
        let ingestor = DocumentIngestor::new(
            Arc::new(FailingDocStore),
            vectors.clone(),
            Arc::new(HashEmbedder::new(64)),
            64,
            8,
        );

        let err = ingestor
            .ingest_text("# Doc\n\nSome body text.", "file:///a.md", "kb1")
            .await
            .unwrap_err();
        assert!(matches!(err, MnemonError::Internal(_)));

        let embedder = HashEmbedder::new(64);
        let query = embedder.embed(&["body text".into()]).await.unwrap();
        let hits = vectors.search("kb1", &query[0], 5, None).await.unwrap();
        assert!(hits.is_empty(), "chunks must be rolled back");
    }
}
