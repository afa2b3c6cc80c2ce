// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared domain types: chat messages, memory items, documents, chunks,
//! and context packets, plus vector codec helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message exchanged with an LLM provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call options for an LLM invocation.
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Sampling temperature, clamped to [0.0, 2.0] by providers.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request timeout.
    pub timeout: Option<std::time::Duration>,
}

/// The four memory types of the multi-store memory system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Short-lived in-process storage with capacity and TTL.
    Working,
    /// Durable event records with session context.
    Episodic,
    /// Durable concept knowledge, optionally graph-linked.
    Semantic,
    /// Durable per-modality perceptual descriptions.
    Perceptual,
}

impl MemoryType {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Working => "working",
            MemoryType::Episodic => "episodic",
            MemoryType::Semantic => "semantic",
            MemoryType::Perceptual => "perceptual",
        }
    }

    /// Parse from SQLite string. Unknown values fall back to working.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "episodic" => MemoryType::Episodic,
            "semantic" => MemoryType::Semantic,
            "perceptual" => MemoryType::Perceptual,
            _ => MemoryType::Working,
        }
    }

    /// All four types in canonical order.
    pub fn all() -> [MemoryType; 4] {
        [
            MemoryType::Working,
            MemoryType::Episodic,
            MemoryType::Semantic,
            MemoryType::Perceptual,
        ]
    }
}

/// A single item held by one of the memory stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique identifier within the owning user scope.
    pub id: String,
    /// Owner of this item.
    pub user_id: String,
    /// The remembered content.
    pub content: String,
    /// Which store this item belongs to.
    pub memory_type: MemoryType,
    /// Importance in [0.0, 1.0]. Monotone under access boosts, capped at 1.0.
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    /// Working items expire at `created_at + TTL`; durable items carry `None`.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form metadata (session_id, event_type, concept, modality, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    /// Embedding vector, populated by durable stores.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryItem {
    /// Creates a new item with a fresh id and clamped importance.
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        memory_type: MemoryType,
        importance: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            content: content.into(),
            memory_type,
            importance: importance.clamp(0.0, 1.0),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            expires_at: None,
            metadata: serde_json::Map::new(),
            embedding: None,
        }
    }

    /// Records an access: bumps the counter and timestamp and nudges
    /// importance upward, bounded by 1.0.
    pub fn boost_access(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
        self.importance = (self.importance + 0.01).min(1.0);
    }

    /// True when the item carries an expiry in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A (subject, predicate, object) edge in the semantic memory graph,
/// with the memory item that asserted it as provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub provenance: String,
}

/// Detected input format of an ingested document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Md,
    Txt,
    Html,
    Json,
    Csv,
    Pdf,
    Docx,
    Xlsx,
}

impl FormatTag {
    /// Maps a lowercase file extension to a format tag.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "md" | "markdown" => Some(FormatTag::Md),
            "txt" | "text" | "log" => Some(FormatTag::Txt),
            "html" | "htm" => Some(FormatTag::Html),
            "json" => Some(FormatTag::Json),
            "csv" => Some(FormatTag::Csv),
            "pdf" => Some(FormatTag::Pdf),
            "docx" => Some(FormatTag::Docx),
            "xlsx" => Some(FormatTag::Xlsx),
            _ => None,
        }
    }
}

/// A normalised document owned by the namespace that ingested it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub namespace: String,
    pub source_uri: String,
    pub format_tag: FormatTag,
    /// Normalised Markdown body.
    pub markdown: String,
    pub ingested_at: DateTime<Utc>,
}

/// A bounded-token span of a normalised Markdown document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub namespace: String,
    /// 0-based position within the document.
    pub ordinal: usize,
    pub text: String,
    pub token_count: usize,
    /// Stack of enclosing `#..######` titles at the chunk's start.
    pub heading_path: Vec<String>,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

/// Provenance hint for a context packet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleHint {
    System,
    History,
    Memory,
    Rag,
    Tool,
    Note,
    Other,
}

/// A self-described text fragment with provenance and relevance, the
/// atomic unit consumed by the context builder. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPacket {
    /// Text included verbatim in the built prompt.
    pub content: String,
    pub role_hint: RoleHint,
    pub timestamp: DateTime<Utc>,
    pub token_count: usize,
    /// Relevance in [0.0, 1.0].
    pub relevance_score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl ContextPacket {
    /// Creates a packet, counting tokens for the given content.
    pub fn new(content: impl Into<String>, role_hint: RoleHint, relevance_score: f64) -> Self {
        let content = content.into();
        let token_count = crate::tokens::count_tokens(&content);
        Self {
            content,
            role_hint,
            timestamp: Utc::now(),
            token_count,
            relevance_score: relevance_score.clamp(0.0, 1.0),
            metadata: serde_json::Map::new(),
        }
    }
}

/// A single similarity search result from a vector store.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            f32::from_le_bytes(bytes)
        })
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_item_new_clamps_importance() {
        let item = MemoryItem::new("u1", "fact", MemoryType::Semantic, 1.7);
        assert_eq!(item.importance, 1.0);
        let item = MemoryItem::new("u1", "fact", MemoryType::Semantic, -0.3);
        assert_eq!(item.importance, 0.0);
    }

    #[test]
    fn boost_access_is_bounded() {
        let mut item = MemoryItem::new("u1", "fact", MemoryType::Episodic, 0.995);
        let created = item.created_at;
        item.boost_access();
        item.boost_access();
        assert_eq!(item.access_count, 2);
        assert_eq!(item.importance, 1.0);
        assert!(item.last_accessed_at >= created);
    }

    #[test]
    fn memory_type_roundtrip() {
        for ty in MemoryType::all() {
            assert_eq!(MemoryType::from_str_value(ty.as_str()), ty);
        }
        assert_eq!(MemoryType::from_str_value("garbage"), MemoryType::Working);
    }

    #[test]
    fn format_tag_from_extension() {
        assert_eq!(FormatTag::from_extension("md"), Some(FormatTag::Md));
        assert_eq!(FormatTag::from_extension("htm"), Some(FormatTag::Html));
        assert_eq!(FormatTag::from_extension("xlsx"), Some(FormatTag::Xlsx));
        assert_eq!(FormatTag::from_extension("exe"), None);
    }

    #[test]
    fn context_packet_counts_tokens() {
        let packet = ContextPacket::new("hello world", RoleHint::Memory, 0.8);
        assert!(packet.token_count > 0);
        assert_eq!(packet.relevance_score, 0.8);
    }

    #[test]
    fn vec_blob_roundtrip() {
        let original = vec![0.1_f32, -0.5, 1.0, 0.0];
        let recovered = blob_to_vec(&vec_to_blob(&original));
        assert_eq!(original, recovered);
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = vec![1.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < f32::EPSILON);
        assert_eq!(cosine_similarity(&a, &[0.0, 1.0]), 0.0);
        // Mismatched lengths yield 0 rather than panicking.
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }

    #[test]
    fn role_serde_lowercase() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"user\""));
    }
}
