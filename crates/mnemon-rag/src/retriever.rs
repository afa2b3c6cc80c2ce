// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity retrieval over ingested chunks, with optional multi-query
//! expansion (MQE) and hypothetical document embedding (HyDE), plus a
//! citation-grounded `ask` variant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

use mnemon_core::MnemonError;
use mnemon_core::traits::{ChatClient, DocumentStore, Embedder, VectorStore};
use mnemon_core::types::{ChatMessage, ContextPacket, InvokeOptions, RoleHint};

/// Rank constant for reciprocal rank fusion.
const RRF_K: f64 = 60.0;

/// Per-call retrieval options.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub k: usize,
    pub enable_mqe: bool,
    pub enable_hyde: bool,
    pub filter: Option<serde_json::Map<String, Value>>,
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            k: 5,
            enable_mqe: false,
            enable_hyde: false,
            filter: None,
            min_score: 0.0,
        }
    }
}

/// A retrieved chunk with its scores, before packet conversion.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub ordinal: usize,
    pub text: String,
    pub heading_path: Vec<String>,
    pub ingested_at: DateTime<Utc>,
    /// Cosine similarity against the (original) query vector.
    pub cosine: f32,
    /// Fusion score when RRF was applied, otherwise equals cosine.
    pub fused: f64,
}

/// Retriever over one vector index plus its document store.
pub struct Retriever {
    vectors: Arc<dyn VectorStore>,
    #[allow(dead_code)]
    documents: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatClient>,
}

const PARAPHRASE_PROMPT: &str = "Rewrite the following search query as up to 5 alternative \
phrasings that preserve its meaning. Output one phrasing per line with no numbering and no \
commentary.\n\nQuery: ";

const HYDE_PROMPT: &str = "Write a concise, factual answer to the following question as if \
quoting from a reference document. One to three short paragraphs, no preamble.\n\nQuestion: ";

const ANSWER_SYSTEM_PROMPT: &str = "You are a precise assistant answering from the provided \
context only. When a sentence relies on a context entry, append that entry's citation marker \
verbatim, e.g. [source: doc-id#0]. If the context does not contain the answer, say so.";

impl Retriever {
    pub fn new(
        vectors: Arc<dyn VectorStore>,
        documents: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            vectors,
            documents,
            embedder,
            chat,
        }
    }

    /// Retrieves the top matches for a query as context packets.
    pub async fn search(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<ContextPacket>, MnemonError> {
        let chunks = self.search_chunks(namespace, query, opts).await?;
        Ok(chunks
            .into_iter()
            .map(|chunk| {
                let mut packet = ContextPacket::new(
                    chunk.text.clone(),
                    RoleHint::Rag,
                    f64::from(chunk.cosine).clamp(0.0, 1.0),
                );
                packet.timestamp = chunk.ingested_at;
                packet
                    .metadata
                    .insert("chunk_id".into(), Value::String(chunk.chunk_id));
                packet
                    .metadata
                    .insert("document_id".into(), Value::String(chunk.document_id));
                packet
                    .metadata
                    .insert("ordinal".into(), Value::from(chunk.ordinal));
                packet.metadata.insert(
                    "heading_path".into(),
                    Value::from(chunk.heading_path.clone()),
                );
                packet
            })
            .collect())
    }

    /// Retrieves raw scored chunks. The packet-free form used by `ask`.
    pub async fn search_chunks(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>, MnemonError> {
        let mode = match (opts.enable_mqe, opts.enable_hyde) {
            (false, false) => "plain",
            (true, false) => "mqe",
            (false, true) => "hyde",
            (true, true) => "combined",
        };
        counter!("mnemon_rag_searches_total", "mode" => mode).increment(1);

        let baseline = self.plain_search(namespace, query, opts).await?;
        let mut result = match (opts.enable_mqe, opts.enable_hyde) {
            (false, false) => baseline,
            (true, false) => self.mqe_search(namespace, query, opts, baseline).await?,
            (false, true) => {
                let hyde = self.hyde_search(namespace, query, opts).await?;
                rrf_fuse(&[baseline, hyde])
            }
            (true, true) => {
                let mqe = self
                    .mqe_search(namespace, query, opts, baseline.clone())
                    .await?;
                let hyde = self.hyde_search(namespace, query, opts).await?;
                rrf_fuse(&[mqe, hyde])
            }
        };

        result.retain(|c| f64::from(c.cosine) >= opts.min_score);
        result.truncate(opts.k);
        debug!(%namespace, mode, hits = result.len(), "retrieval complete");
        Ok(result)
    }

    /// Retrieval-augmented answering with inline citations.
    ///
    /// Citation markers the model invents for chunks outside the
    /// retrieval set are stripped from the returned answer.
    pub async fn ask(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<String, MnemonError> {
        let chunks = self.search_chunks(namespace, query, opts).await?;
        if chunks.is_empty() {
            return Ok("I could not find anything relevant in the knowledge base.".to_string());
        }

        let mut context = String::new();
        for chunk in &chunks {
            context.push_str(&format!(
                "[source: {}#{}]\n{}\n\n",
                chunk.document_id, chunk.ordinal, chunk.text
            ));
        }
        let user = format!("Context:\n{context}Question: {query}");
        let answer = self
            .chat
            .invoke(
                &[
                    ChatMessage::system(ANSWER_SYSTEM_PROMPT),
                    ChatMessage::user(user),
                ],
                &InvokeOptions::default(),
            )
            .await?;

        let valid: std::collections::HashSet<(String, usize)> = chunks
            .iter()
            .map(|c| (c.document_id.clone(), c.ordinal))
            .collect();
        Ok(strip_unknown_citations(&answer, &valid))
    }

    async fn plain_search(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>, MnemonError> {
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        self.raw_search(namespace, &vectors[0], opts).await
    }

    async fn mqe_search(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
        baseline: Vec<RetrievedChunk>,
    ) -> Result<Vec<RetrievedChunk>, MnemonError> {
        let paraphrases = match self.paraphrase(query).await {
            Ok(lines) => lines,
            Err(e) => {
                // Expansion is best-effort; recall falls back to baseline.
                warn!(error = %e, "query expansion failed, using baseline only");
                return Ok(baseline);
            }
        };
        if paraphrases.is_empty() {
            return Ok(baseline);
        }

        let vectors = self.embedder.embed(&paraphrases).await?;
        let mut merged: std::collections::HashMap<String, RetrievedChunk> =
            baseline.into_iter().map(|c| (c.chunk_id.clone(), c)).collect();
        for vector in &vectors {
            for chunk in self.raw_search(namespace, vector, opts).await? {
                merged
                    .entry(chunk.chunk_id.clone())
                    .and_modify(|existing| {
                        if chunk.cosine > existing.cosine {
                            existing.cosine = chunk.cosine;
                            existing.fused = f64::from(chunk.cosine);
                        }
                    })
                    .or_insert(chunk);
            }
        }
        let mut result: Vec<RetrievedChunk> = merged.into_values().collect();
        sort_chunks(&mut result);
        result.truncate(opts.k);
        Ok(result)
    }

    async fn hyde_search(
        &self,
        namespace: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>, MnemonError> {
        let draft = match self
            .chat
            .invoke(
                &[ChatMessage::user(format!("{HYDE_PROMPT}{query}"))],
                &InvokeOptions::default(),
            )
            .await
        {
            Ok(draft) => draft,
            Err(e) => {
                warn!(error = %e, "hypothetical draft failed, using baseline only");
                return self.plain_search(namespace, query, opts).await;
            }
        };
        let vectors = self.embedder.embed(&[draft]).await?;
        self.raw_search(namespace, &vectors[0], opts).await
    }

    async fn paraphrase(&self, query: &str) -> Result<Vec<String>, MnemonError> {
        let reply = self
            .chat
            .invoke(
                &[ChatMessage::user(format!("{PARAPHRASE_PROMPT}{query}"))],
                &InvokeOptions::default(),
            )
            .await?;
        Ok(reply
            .lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-')
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .take(5)
            .collect())
    }

    async fn raw_search(
        &self,
        namespace: &str,
        vector: &[f32],
        opts: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>, MnemonError> {
        let hits = self
            .vectors
            .search(namespace, vector, opts.k, opts.filter.as_ref())
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let payload = &hit.payload;
                RetrievedChunk {
                    chunk_id: hit.id,
                    document_id: payload
                        .get("document_id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    ordinal: payload
                        .get("ordinal")
                        .and_then(Value::as_u64)
                        .unwrap_or_default() as usize,
                    text: payload
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    heading_path: payload
                        .get("heading_path")
                        .and_then(Value::as_array)
                        .map(|a| {
                            a.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                    ingested_at: payload
                        .get("ingested_at")
                        .and_then(Value::as_str)
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC),
                    cosine: hit.score,
                    fused: f64::from(hit.score),
                }
            })
            .collect())
    }
}

/// Orders by fused score desc, then cosine desc, then newer ingestion.
fn sort_chunks(chunks: &mut [RetrievedChunk]) {
    chunks.sort_by(|a, b| {
        b.fused
            .partial_cmp(&a.fused)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.cosine
                    .partial_cmp(&a.cosine)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then(b.ingested_at.cmp(&a.ingested_at))
    });
}

/// Reciprocal rank fusion across result lists, deduplicated by chunk id.
fn rrf_fuse(lists: &[Vec<RetrievedChunk>]) -> Vec<RetrievedChunk> {
    let mut merged: std::collections::HashMap<String, RetrievedChunk> =
        std::collections::HashMap::new();
    for list in lists {
        for (rank, chunk) in list.iter().enumerate() {
            let contribution = 1.0 / (RRF_K + rank as f64 + 1.0);
            merged
                .entry(chunk.chunk_id.clone())
                .and_modify(|existing| {
                    existing.fused += contribution;
                    if chunk.cosine > existing.cosine {
                        existing.cosine = chunk.cosine;
                    }
                })
                .or_insert_with(|| {
                    let mut chunk = chunk.clone();
                    chunk.fused = contribution;
                    chunk
                });
        }
    }
    let mut result: Vec<RetrievedChunk> = merged.into_values().collect();
    sort_chunks(&mut result);
    result
}

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[source:\s*([^#\]\s]+)#(\d+)\]").unwrap());

/// Removes citation markers that do not correspond to retrieved chunks.
fn strip_unknown_citations(
    answer: &str,
    valid: &std::collections::HashSet<(String, usize)>,
) -> String {
    CITATION_RE
        .replace_all(answer, |caps: &regex::Captures<'_>| {
            let doc = caps[1].to_string();
            let ordinal: usize = caps[2].parse().unwrap_or(usize::MAX);
            if valid.contains(&(doc, ordinal)) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;
    use mnemon_test_utils::MockChatClient;

    use crate::ingest::DocumentIngestor;

    const GUIDE: &str = "# Cooking Guide\n\nPasta needs salted boiling water and eight minutes.\n\n## Baking\n\nBread requires yeast, flour, water, and patience overnight.\n\n## Grilling\n\nSteak wants high heat and a short rest before slicing.";

    async fn seeded() -> (Arc<MemStore>, Arc<HashEmbedder>, String) {
        let store = Arc::new(MemStore::new());
        let embedder = Arc::new(HashEmbedder::new(128));
        let ingestor = DocumentIngestor::new(store.clone(), store.clone(), embedder.clone(), 48, 0);
        let doc = ingestor
            .ingest_text(GUIDE, "file:///guide.md", "kb1")
            .await
            .unwrap();
        (store, embedder, doc.document_id)
    }

    fn retriever(
        store: Arc<MemStore>,
        embedder: Arc<HashEmbedder>,
        chat: MockChatClient,
    ) -> Retriever {
        Retriever::new(store.clone(), store, embedder, Arc::new(chat))
    }

    #[tokio::test]
    async fn plain_search_finds_relevant_chunk() {
        let (store, embedder, _) = seeded().await;
        let retriever = retriever(store, embedder, MockChatClient::default());

        let packets = retriever
            .search("kb1", "how long to boil pasta", &SearchOptions::default())
            .await
            .unwrap();
        assert!(!packets.is_empty());
        assert!(packets[0].content.contains("Pasta"));
        assert_eq!(packets[0].role_hint, RoleHint::Rag);
    }

    #[tokio::test]
    async fn retrieved_chunks_carry_heading_paths() {
        let (store, embedder, _) = seeded().await;
        let retriever = retriever(store, embedder, MockChatClient::default());

        let chunks = retriever
            .search_chunks("kb1", "bread yeast flour", &SearchOptions::default())
            .await
            .unwrap();
        assert!(
            chunks
                .iter()
                .any(|c| c.heading_path.first().map(String::as_str) == Some("Cooking Guide"))
        );
    }

    #[tokio::test]
    async fn plain_search_is_deterministic() {
        let (store, embedder, _) = seeded().await;
        let retriever = retriever(store, embedder, MockChatClient::default());
        let opts = SearchOptions::default();

        let a = retriever.search_chunks("kb1", "bread yeast", &opts).await.unwrap();
        let b = retriever.search_chunks("kb1", "bread yeast", &opts).await.unwrap();
        let ids = |v: &[RetrievedChunk]| v.iter().map(|c| c.chunk_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[tokio::test]
    async fn empty_namespace_returns_empty() {
        let store = Arc::new(MemStore::new());
        let retriever = retriever(
            store,
            Arc::new(HashEmbedder::new(128)),
            MockChatClient::default(),
        );
        let packets = retriever
            .search("void", "anything", &SearchOptions::default())
            .await
            .unwrap();
        assert!(packets.is_empty());
    }

    #[tokio::test]
    async fn mqe_merges_paraphrase_results() {
        let (store, embedder, _) = seeded().await;
        let chat = MockChatClient::new(["boiling pasta time\ncooking noodles duration"]);
        let retriever = retriever(store, embedder, chat.clone());

        let opts = SearchOptions {
            enable_mqe: true,
            ..SearchOptions::default()
        };
        let chunks = retriever
            .search_chunks("kb1", "pasta time", &opts)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chat.call_count(), 1);
        // Scores stay sorted descending.
        for pair in chunks.windows(2) {
            assert!(pair[0].fused >= pair[1].fused);
        }
    }

    #[tokio::test]
    async fn mqe_degrades_to_baseline_on_provider_error() {
        let (store, embedder, _) = seeded().await;
        // Empty script: the paraphrase call errors out.
        let retriever = retriever(store, embedder, MockChatClient::default());

        let opts = SearchOptions {
            enable_mqe: true,
            ..SearchOptions::default()
        };
        let chunks = retriever.search_chunks("kb1", "pasta", &opts).await.unwrap();
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn hyde_uses_draft_vector() {
        let (store, embedder, _) = seeded().await;
        let chat =
            MockChatClient::new(["Bread requires yeast flour water and overnight patience."]);
        let retriever = retriever(store, embedder, chat.clone());

        let opts = SearchOptions {
            enable_hyde: true,
            ..SearchOptions::default()
        };
        let chunks = retriever
            .search_chunks("kb1", "what does bread need", &opts)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().any(|c| c.text.contains("Bread")));
        assert_eq!(chat.call_count(), 1);
    }

    #[tokio::test]
    async fn ask_returns_answer_with_valid_citation() {
        let (store, embedder, doc_id) = seeded().await;
        let chat = MockChatClient::default();
        let retriever = retriever(store, embedder, chat.clone());

        // Find which chunk ask() will retrieve, then script an answer citing it.
        let top = retriever
            .search_chunks("kb1", "pasta", &SearchOptions::default())
            .await
            .unwrap();
        chat.push_response(format!(
            "Boil for eight minutes. [source: {}#{}] [source: bogus#9]",
            top[0].document_id, top[0].ordinal
        ));

        let answer = retriever
            .ask("kb1", "pasta", &SearchOptions::default())
            .await
            .unwrap();
        assert!(answer.contains(&format!("[source: {doc_id}#{}]", top[0].ordinal)));
        assert!(!answer.contains("bogus"));
    }

    #[tokio::test]
    async fn ask_empty_namespace_short_circuits() {
        let store = Arc::new(MemStore::new());
        let chat = MockChatClient::default();
        let retriever = retriever(store, Arc::new(HashEmbedder::new(128)), chat.clone());

        let answer = retriever
            .ask("void", "anything", &SearchOptions::default())
            .await
            .unwrap();
        assert!(answer.contains("could not find"));
        assert_eq!(chat.call_count(), 0);
    }

    #[test]
    fn rrf_prefers_items_present_in_both_lists() {
        let mk = |id: &str, cosine: f32| RetrievedChunk {
            chunk_id: id.to_string(),
            document_id: "d".into(),
            ordinal: 0,
            text: String::new(),
            heading_path: Vec::new(),
            ingested_at: Utc::now(),
            cosine,
            fused: f64::from(cosine),
        };
        let fused = rrf_fuse(&[
            vec![mk("a", 0.9), mk("b", 0.8)],
            vec![mk("b", 0.7), mk("c", 0.6)],
        ]);
        assert_eq!(fused[0].chunk_id, "b");
        assert!((fused[0].cosine - 0.8).abs() < 1e-6);
    }

    #[test]
    fn citation_regex_parses_markers() {
        let caps = CITATION_RE.captures("see [source: doc-1#3] here").unwrap();
        assert_eq!(&caps[1], "doc-1");
        assert_eq!(&caps[2], "3");
    }
}
