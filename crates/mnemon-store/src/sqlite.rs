// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed store implementing the document, vector, and memory
//! record traits in one database file.
//!
//! Vectors are stored as little-endian f32 BLOBs. All writes serialize
//! through tokio-rusqlite's single background thread; do not create
//! additional connections for writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde_json::Value;
use tokio_rusqlite::Connection;
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::traits::vector::payload_matches;
use mnemon_core::traits::{DocumentFilter, DocumentStore, MemoryRecordStore, VectorStore};
use mnemon_core::types::{
    Document, FormatTag, GraphEdge, MemoryItem, MemoryType, SearchHit, blob_to_vec,
    cosine_similarity, vec_to_blob,
};

/// Helper to convert rusqlite/tokio_rusqlite errors into MnemonError::Storage.
fn storage_err<E>(e: E) -> MnemonError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    MnemonError::Storage { source: e.into() }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, MnemonError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MnemonError::Internal(format!("bad timestamp {raw:?}: {e}")))
}

/// Schema statements executed at open. Idempotent.
const MIGRATIONS: &str = "
CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY,
    namespace   TEXT NOT NULL,
    source_uri  TEXT NOT NULL,
    format_tag  TEXT NOT NULL,
    markdown    TEXT NOT NULL,
    ingested_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_namespace ON documents(namespace);

CREATE TABLE IF NOT EXISTS vectors (
    namespace TEXT NOT NULL,
    id        TEXT NOT NULL,
    vector    BLOB NOT NULL,
    payload   TEXT NOT NULL,
    PRIMARY KEY (namespace, id)
);

CREATE TABLE IF NOT EXISTS vector_namespaces (
    namespace  TEXT PRIMARY KEY,
    dimensions INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS memory_items (
    id               TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    memory_type      TEXT NOT NULL,
    content          TEXT NOT NULL,
    importance       REAL NOT NULL,
    created_at       TEXT NOT NULL,
    last_accessed_at TEXT NOT NULL,
    access_count     INTEGER NOT NULL,
    expires_at       TEXT,
    metadata         TEXT NOT NULL,
    embedding        BLOB
);
CREATE INDEX IF NOT EXISTS idx_memory_user_type ON memory_items(user_id, memory_type);

CREATE TABLE IF NOT EXISTS graph_edges (
    subject    TEXT NOT NULL,
    predicate  TEXT NOT NULL,
    object     TEXT NOT NULL,
    provenance TEXT NOT NULL,
    PRIMARY KEY (subject, predicate, object, provenance)
);
";

/// SQLite store for documents, vectors, memory items, and graph edges.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a database file, applying migrations and WAL mode.
    pub async fn open(path: &std::path::Path) -> Result<Self, MnemonError> {
        let conn = Connection::open(path).await.map_err(storage_err)?;
        Self::init(conn).await
    }

    /// Opens an in-memory database (tests, ephemeral runs).
    pub async fn open_in_memory() -> Result<Self, MnemonError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, MnemonError> {
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(MIGRATIONS)?;
            Ok(())
        })
        .await
        .map_err(storage_err::<tokio_rusqlite::Error>)?;
        debug!("sqlite store initialised");
        Ok(Self { conn })
    }

    /// Fixes or checks the dimensionality for a namespace.
    async fn check_dimensions(&self, namespace: &str, dims: usize) -> Result<(), MnemonError> {
        let namespace = namespace.to_string();
        let existing: Option<i64> = self
            .conn
            .call(move |conn| {
                let existing = conn
                    .query_row(
                        "SELECT dimensions FROM vector_namespaces WHERE namespace = ?1",
                        rusqlite::params![namespace],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(existing)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        match existing {
            Some(d) if d as usize != dims => Err(MnemonError::Internal(format!(
                "vector dimension mismatch: namespace is fixed at {d}, got {dims}"
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn put(&self, doc: &Document) -> Result<(), MnemonError> {
        let document_id = doc.document_id.clone();
        let namespace = doc.namespace.clone();
        let source_uri = doc.source_uri.clone();
        let format_tag = doc.format_tag.to_string();
        let markdown = doc.markdown.clone();
        let ingested_at = doc.ingested_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO documents \
                     (document_id, namespace, source_uri, format_tag, markdown, ingested_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        document_id,
                        namespace,
                        source_uri,
                        format_tag,
                        markdown,
                        ingested_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }

    async fn get(&self, document_id: &str) -> Result<Option<Document>, MnemonError> {
        let id = document_id.to_string();
        let row: Option<(String, String, String, String, String, String)> = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT document_id, namespace, source_uri, format_tag, markdown, \
                         ingested_at FROM documents WHERE document_id = ?1",
                        rusqlite::params![id],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        row.map(row_to_document).transpose()
    }

    async fn delete(&self, document_id: &str) -> Result<(), MnemonError> {
        let id = document_id.to_string();
        let affected = self
            .conn
            .call(move |conn| {
                // Cascade: remove the document's chunks from the vector index first.
                conn.execute(
                    "DELETE FROM vectors WHERE json_extract(payload, '$.document_id') = ?1",
                    rusqlite::params![id],
                )?;
                let affected = conn.execute(
                    "DELETE FROM documents WHERE document_id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(affected)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        if affected == 0 {
            return Err(MnemonError::NotFound {
                kind: "document",
                id: document_id.to_string(),
            });
        }
        Ok(())
    }

    async fn list(
        &self,
        namespace: &str,
        filter: Option<&DocumentFilter>,
    ) -> Result<Vec<Document>, MnemonError> {
        let namespace = namespace.to_string();
        let rows: Vec<(String, String, String, String, String, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT document_id, namespace, source_uri, format_tag, markdown, \
                     ingested_at FROM documents WHERE namespace = ?1 ORDER BY ingested_at DESC",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![namespace], |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            documents.push(row_to_document(row)?);
        }
        if let Some(filter) = filter {
            documents.retain(|doc| {
                filter.format_tag.is_none_or(|tag| doc.format_tag == tag)
                    && filter
                        .source_uri_prefix
                        .as_deref()
                        .is_none_or(|prefix| doc.source_uri.starts_with(prefix))
            });
        }
        Ok(documents)
    }
}

fn row_to_document(
    row: (String, String, String, String, String, String),
) -> Result<Document, MnemonError> {
    let (document_id, namespace, source_uri, format_tag, markdown, ingested_at) = row;
    let format_tag: FormatTag = format_tag
        .parse()
        .map_err(|_| MnemonError::Internal(format!("bad format_tag {format_tag:?}")))?;
    Ok(Document {
        document_id,
        namespace,
        source_uri,
        format_tag,
        markdown,
        ingested_at: parse_ts(&ingested_at)?,
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        vector: &[f32],
        payload: Value,
    ) -> Result<(), MnemonError> {
        self.check_dimensions(namespace, vector.len()).await?;

        let namespace = namespace.to_string();
        let id = id.to_string();
        let dims = vector.len() as i64;
        let blob = vec_to_blob(vector);
        let payload_text = payload.to_string();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO vector_namespaces (namespace, dimensions) \
                     VALUES (?1, ?2)",
                    rusqlite::params![namespace, dims],
                )?;
                conn.execute(
                    "INSERT OR REPLACE INTO vectors (namespace, id, vector, payload) \
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![namespace, id, blob, payload_text],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }

    async fn search(
        &self,
        namespace: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&serde_json::Map<String, Value>>,
    ) -> Result<Vec<SearchHit>, MnemonError> {
        let ns = namespace.to_string();
        let rows: Vec<(String, Vec<u8>, String)> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, vector, payload FROM vectors WHERE namespace = ?1")?;
                let rows = stmt
                    .query_map(rusqlite::params![ns], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        let mut hits: Vec<SearchHit> = Vec::new();
        for (id, blob, payload_text) in rows {
            let candidate = blob_to_vec(&blob);
            if candidate.len() != vector.len() {
                continue;
            }
            let payload: Value = serde_json::from_str(&payload_text)
                .map_err(|e| MnemonError::Internal(format!("bad payload for {id}: {e}")))?;
            if let Some(filter) = filter
                && !payload_matches(&payload, filter)
            {
                continue;
            }
            hits.push(SearchHit {
                id,
                score: cosine_similarity(vector, &candidate),
                payload,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete(&self, namespace: &str, id: &str) -> Result<(), MnemonError> {
        let namespace = namespace.to_string();
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM vectors WHERE namespace = ?1 AND id = ?2",
                    rusqlite::params![namespace, id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }
}

type MemoryRow = (
    String,
    String,
    String,
    String,
    f64,
    String,
    String,
    i64,
    Option<String>,
    String,
    Option<Vec<u8>>,
);

#[async_trait]
impl MemoryRecordStore for SqliteStore {
    async fn put_item(&self, item: &MemoryItem) -> Result<(), MnemonError> {
        let id = item.id.clone();
        let user_id = item.user_id.clone();
        let memory_type = item.memory_type.as_str().to_string();
        let content = item.content.clone();
        let importance = item.importance;
        let created_at = item.created_at.to_rfc3339();
        let last_accessed_at = item.last_accessed_at.to_rfc3339();
        let access_count = item.access_count as i64;
        let expires_at = item.expires_at.map(|at| at.to_rfc3339());
        let metadata = Value::Object(item.metadata.clone()).to_string();
        let embedding = item.embedding.as_ref().map(|v| vec_to_blob(v));

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO memory_items \
                     (id, user_id, memory_type, content, importance, created_at, \
                      last_accessed_at, access_count, expires_at, metadata, embedding) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    rusqlite::params![
                        id,
                        user_id,
                        memory_type,
                        content,
                        importance,
                        created_at,
                        last_accessed_at,
                        access_count,
                        expires_at,
                        metadata,
                        embedding
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }

    async fn get_item(&self, id: &str) -> Result<Option<MemoryItem>, MnemonError> {
        let id = id.to_string();
        let row: Option<MemoryRow> = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, user_id, memory_type, content, importance, created_at, \
                         last_accessed_at, access_count, expires_at, metadata, embedding \
                         FROM memory_items WHERE id = ?1",
                        rusqlite::params![id],
                        row_to_memory_tuple,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        row.map(tuple_to_memory_item).transpose()
    }

    async fn delete_item(&self, id: &str) -> Result<(), MnemonError> {
        let owned = id.to_string();
        let affected = self
            .conn
            .call(move |conn| {
                let affected = conn.execute(
                    "DELETE FROM memory_items WHERE id = ?1",
                    rusqlite::params![owned],
                )?;
                Ok(affected)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;
        if affected == 0 {
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
        let user_id = user_id.to_string();
        let type_str = memory_type.map(|ty| ty.as_str().to_string());
        let rows: Vec<MemoryRow> = self
            .conn
            .call(move |conn| {
                let rows = match type_str {
                    Some(ty) => {
                        let mut stmt = conn.prepare(
                            "SELECT id, user_id, memory_type, content, importance, created_at, \
                             last_accessed_at, access_count, expires_at, metadata, embedding \
                             FROM memory_items WHERE user_id = ?1 AND memory_type = ?2 \
                             ORDER BY created_at DESC",
                        )?;
                        stmt.query_map(rusqlite::params![user_id, ty], row_to_memory_tuple)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                    None => {
                        let mut stmt = conn.prepare(
                            "SELECT id, user_id, memory_type, content, importance, created_at, \
                             last_accessed_at, access_count, expires_at, metadata, embedding \
                             FROM memory_items WHERE user_id = ?1 ORDER BY created_at DESC",
                        )?;
                        stmt.query_map(rusqlite::params![user_id], row_to_memory_tuple)?
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(rows)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)?;

        rows.into_iter().map(tuple_to_memory_item).collect()
    }

    async fn put_edge(&self, edge: &GraphEdge) -> Result<(), MnemonError> {
        let subject = edge.subject.clone();
        let predicate = edge.predicate.clone();
        let object = edge.object.clone();
        let provenance = edge.provenance.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO graph_edges (subject, predicate, object, provenance) \
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![subject, predicate, object, provenance],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }

    async fn neighbors(&self, concept: &str) -> Result<Vec<GraphEdge>, MnemonError> {
        let concept = concept.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT subject, predicate, object, provenance FROM graph_edges \
                     WHERE subject = ?1 OR object = ?1",
                )?;
                let edges = stmt
                    .query_map(rusqlite::params![concept], |row| {
                        Ok(GraphEdge {
                            subject: row.get(0)?,
                            predicate: row.get(1)?,
                            object: row.get(2)?,
                            provenance: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(edges)
            })
            .await
            .map_err(storage_err::<tokio_rusqlite::Error>)
    }
}

fn row_to_memory_tuple(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn tuple_to_memory_item(row: MemoryRow) -> Result<MemoryItem, MnemonError> {
    let (
        id,
        user_id,
        memory_type,
        content,
        importance,
        created_at,
        last_accessed_at,
        access_count,
        expires_at,
        metadata,
        embedding,
    ) = row;
    let metadata: Value = serde_json::from_str(&metadata)
        .map_err(|e| MnemonError::Internal(format!("bad metadata for {id}: {e}")))?;
    let metadata = match metadata {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    Ok(MemoryItem {
        id,
        user_id,
        content,
        memory_type: MemoryType::from_str_value(&memory_type),
        importance,
        created_at: parse_ts(&created_at)?,
        last_accessed_at: parse_ts(&last_accessed_at)?,
        access_count: access_count.max(0) as u64,
        expires_at: expires_at.as_deref().map(parse_ts).transpose()?,
        metadata,
        embedding: embedding.map(|blob| blob_to_vec(&blob)),
    })
}
