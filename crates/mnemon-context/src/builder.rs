// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-budgeted prompt assembly.
//!
//! The builder is a pure function over its inputs: given identical
//! packets, history, and LLM compression outputs, it produces
//! byte-identical prompts. Sections appear in a fixed order and the
//! result never exceeds `max_tokens`.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::tokens::count_tokens;
use mnemon_core::traits::ChatClient;
use mnemon_core::types::{
    ChatMessage, ContextPacket, InvokeOptions, MemoryType, Role, RoleHint,
};
use mnemon_memory::MemoryManager;
use mnemon_rag::{Retriever, SearchOptions};

const SYSTEM_HEADER: &str = "=== SYSTEM ===";
const KNOWLEDGE_HEADER: &str = "=== KNOWLEDGE ===";
const MEMORY_HEADER: &str = "=== MEMORY ===";
const TOOL_HEADER: &str = "=== TOOL EVIDENCE ===";
const HISTORY_HEADER: &str = "=== HISTORY ===";
const QUERY_HEADER: &str = "=== QUERY ===";

/// Budget weights for the optional sections, in assembly order:
/// knowledge, memory, tool evidence, history.
const SECTION_WEIGHTS: [f64; 4] = [0.30, 0.25, 0.15, 0.30];

/// History turns above this token count are LLM-compressed when
/// compression is enabled.
const COMPRESS_THRESHOLD_TOKENS: usize = 150;

const COMPRESSION_PROMPT: &str = "Condense the following conversation turn to roughly a \
quarter of its length, keeping every fact, name, and number. Output only the condensed text.\n\n";

/// Maximum tool-observation packets included.
const MAX_TOOL_PACKETS: usize = 3;

/// Builder configuration, one value per knob in the `[context]` section.
#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    pub max_tokens: usize,
    pub reserve_ratio: f64,
    pub min_relevance: f64,
    pub enable_compression: bool,
    pub max_history_turns: usize,
    pub lazy_fetch: bool,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8_000,
            reserve_ratio: 0.2,
            min_relevance: 0.0,
            enable_compression: true,
            max_history_turns: 10,
            lazy_fetch: true,
        }
    }
}

/// Inputs to one `build` call.
#[derive(Default)]
pub struct BuildRequest {
    pub user_query: String,
    pub system_instructions: String,
    pub history: Vec<ChatMessage>,
    pub additional_packets: Vec<ContextPacket>,
}

/// Assembles prompts from packets, memory, and history under a hard
/// token cap.
pub struct ContextBuilder {
    config: ContextBuilderConfig,
    chat: Option<Arc<dyn ChatClient>>,
    memory: Option<Arc<MemoryManager>>,
    retriever: Option<Arc<Retriever>>,
    retrieval_namespace: Option<String>,
}

impl ContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self {
            config,
            chat: None,
            memory: None,
            retriever: None,
            retrieval_namespace: None,
        }
    }

    /// Enables history compression through the given client.
    pub fn with_chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Enables automatic memory packet fetching.
    pub fn with_memory(mut self, memory: Arc<MemoryManager>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Enables automatic knowledge retrieval when `lazy_fetch` is off.
    pub fn with_retriever(mut self, retriever: Arc<Retriever>, namespace: impl Into<String>) -> Self {
        self.retriever = Some(retriever);
        self.retrieval_namespace = Some(namespace.into());
        self
    }

    /// Builds the final prompt string.
    pub async fn build(&self, request: BuildRequest) -> Result<String, MnemonError> {
        let available =
            (self.config.max_tokens as f64 * (1.0 - self.config.reserve_ratio)).floor() as usize;

        let system_section = format!("{SYSTEM_HEADER}\n{}", request.system_instructions.trim());
        let query_section = format!("{QUERY_HEADER}\n{}", request.user_query.trim());
        let mandatory = count_tokens(&system_section) + count_tokens(&query_section) + 2;
        if mandatory > available {
            return Err(MnemonError::BudgetExceeded {
                needed: mandatory,
                max: available,
            });
        }
        let remaining = available - mandatory;

        let rag_packets = self.collect_rag(&request).await?;
        let memory_packets = self.collect_memory(&request).await?;
        let tool_packets = collect_tools(&request);

        let budgets: Vec<usize> = SECTION_WEIGHTS
            .iter()
            .map(|w| (remaining as f64 * w).floor() as usize)
            .collect();

        let mut sections: Vec<String> = vec![system_section];
        if let Some(section) = self.packet_section(KNOWLEDGE_HEADER, rag_packets, budgets[0]) {
            sections.push(section);
        }
        if let Some(section) = self.packet_section(MEMORY_HEADER, memory_packets, budgets[1]) {
            sections.push(section);
        }
        if let Some(section) = self.packet_section(TOOL_HEADER, tool_packets, budgets[2]) {
            sections.push(section);
        }
        if let Some(section) = self.history_section(&request.history, budgets[3]).await? {
            sections.push(section);
        }
        sections.push(query_section);

        let prompt = sections.join("\n\n");
        let total = count_tokens(&prompt);
        debug!(
            tokens = total,
            max = self.config.max_tokens,
            sections = sections.len(),
            "context built"
        );
        Ok(prompt)
    }

    async fn collect_rag(
        &self,
        request: &BuildRequest,
    ) -> Result<Vec<ContextPacket>, MnemonError> {
        let mut packets: Vec<ContextPacket> = request
            .additional_packets
            .iter()
            .filter(|p| p.role_hint == RoleHint::Rag)
            .cloned()
            .collect();
        if !self.config.lazy_fetch
            && let (Some(retriever), Some(namespace)) =
                (&self.retriever, &self.retrieval_namespace)
        {
            packets.extend(
                retriever
                    .search(namespace, &request.user_query, &SearchOptions::default())
                    .await?,
            );
        }
        packets.retain(|p| p.relevance_score >= self.config.min_relevance);
        sort_packets(&mut packets);
        Ok(packets)
    }

    async fn collect_memory(
        &self,
        request: &BuildRequest,
    ) -> Result<Vec<ContextPacket>, MnemonError> {
        let mut packets: Vec<ContextPacket> = request
            .additional_packets
            .iter()
            .filter(|p| matches!(p.role_hint, RoleHint::Memory | RoleHint::Note))
            .cloned()
            .collect();
        if let Some(memory) = &self.memory {
            for item in memory.search(&request.user_query, None, 5, 0.0).await? {
                let mut packet =
                    ContextPacket::new(item.content.clone(), RoleHint::Memory, item.importance);
                packet.timestamp = item.last_accessed_at;
                packet
                    .metadata
                    .insert("memory_type".into(), Value::String(item.memory_type.as_str().into()));
                packets.push(packet);
            }
        }
        packets.retain(|p| p.relevance_score >= self.config.min_relevance);

        // Notes and blockers first, then episodic, then semantic, then
        // the rest; relevance breaks ties within a band.
        packets.sort_by(|a, b| {
            memory_band(a).cmp(&memory_band(b)).then(
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(b.timestamp.cmp(&a.timestamp)),
            )
        });
        Ok(packets)
    }

    /// Fills a packet section up to its budget. Returns `None` when
    /// nothing fits.
    fn packet_section(
        &self,
        header: &str,
        packets: Vec<ContextPacket>,
        budget: usize,
    ) -> Option<String> {
        let mut used = count_tokens(header);
        let mut included: Vec<String> = Vec::new();
        for packet in packets {
            let mut cost = packet.token_count;
            if !included.is_empty() {
                cost += count_tokens("\n\n");
            }
            if used + cost > budget {
                // Packets after the first non-fitting one are dropped.
                break;
            }
            used += cost;
            included.push(packet.content);
        }
        if included.is_empty() {
            return None;
        }
        Some(format!("{header}\n{}", included.join("\n\n")))
    }

    /// Selects the newest history turns that fit, compressing oversized
    /// turns when enabled, and renders them oldest first.
    async fn history_section(
        &self,
        history: &[ChatMessage],
        budget: usize,
    ) -> Result<Option<String>, MnemonError> {
        if history.is_empty() || self.config.max_history_turns == 0 {
            return Ok(None);
        }
        let window: Vec<&ChatMessage> = history
            .iter()
            .rev()
            .take(self.config.max_history_turns)
            .collect();

        let mut used = count_tokens(HISTORY_HEADER);
        let mut lines: Vec<String> = Vec::new();
        for message in window {
            let mut rendered = format!("{}: {}", role_label(message.role), message.content);
            let mut tokens = count_tokens(&rendered);
            if tokens > COMPRESS_THRESHOLD_TOKENS
                && self.config.enable_compression
                && let Some(compressed) = self.compress(&message.content).await
            {
                rendered = format!("{}: {}", role_label(message.role), compressed);
                tokens = count_tokens(&rendered);
            }
            if used + tokens > budget {
                // Turns older than the first non-fitting one are dropped.
                break;
            }
            used += tokens;
            lines.push(rendered);
        }
        if lines.is_empty() {
            return Ok(None);
        }
        lines.reverse();
        Ok(Some(format!("{HISTORY_HEADER}\n{}", lines.join("\n"))))
    }

    async fn compress(&self, content: &str) -> Option<String> {
        let chat = self.chat.as_ref()?;
        match chat
            .invoke(
                &[ChatMessage::user(format!("{COMPRESSION_PROMPT}{content}"))],
                &InvokeOptions::default(),
            )
            .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                debug!(error = %e, "history compression failed, keeping original");
                None
            }
        }
    }
}

fn collect_tools(request: &BuildRequest) -> Vec<ContextPacket> {
    let mut packets: Vec<ContextPacket> = request
        .additional_packets
        .iter()
        .filter(|p| p.role_hint == RoleHint::Tool)
        .cloned()
        .collect();
    // The most recent observations are the relevant evidence.
    packets.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    packets.truncate(MAX_TOOL_PACKETS);
    packets
}

fn sort_packets(packets: &mut [ContextPacket]) {
    packets.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.timestamp.cmp(&a.timestamp))
    });
}

fn memory_band(packet: &ContextPacket) -> u8 {
    if packet.role_hint == RoleHint::Note {
        return 0;
    }
    match packet
        .metadata
        .get("memory_type")
        .and_then(Value::as_str)
        .map(MemoryType::from_str_value)
    {
        Some(MemoryType::Episodic) => 1,
        Some(MemoryType::Semantic) => 2,
        _ => 3,
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}
