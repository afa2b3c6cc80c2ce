// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemon core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

use mnemon_core::MnemonError;

/// Top-level Mnemon configuration.
///
/// Loaded from TOML files with environment variable overrides. All
/// sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemonConfig {
    /// LLM provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Memory system settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// RAG pipeline settings.
    #[serde(default)]
    pub rag: RagConfig,

    /// Context builder settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// ReAct engine settings.
    #[serde(default)]
    pub react: ReactConfig,

    /// Persisted state layout settings.
    #[serde(default)]
    pub state: StateConfig,
}

impl MnemonConfig {
    /// Validates cross-field constraints. Violations are fatal at startup.
    pub fn validate(&self) -> Result<(), MnemonError> {
        if !(0.0..1.0).contains(&self.context.reserve_ratio) {
            return Err(MnemonError::Config(format!(
                "context.reserve_ratio must be in [0.0, 1.0), got {}",
                self.context.reserve_ratio
            )));
        }
        if self.context.max_tokens == 0 {
            return Err(MnemonError::Config(
                "context.max_tokens must be positive".into(),
            ));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(MnemonError::Config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if self.react.max_steps == 0 {
            return Err(MnemonError::Config("react.max_steps must be positive".into()));
        }
        for ty in &self.memory.enabled_types {
            if !matches!(ty.as_str(), "working" | "episodic" | "semantic" | "perceptual") {
                return Err(MnemonError::Config(format!(
                    "memory.enabled_types contains unknown type {ty:?}"
                )));
            }
        }
        Ok(())
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider kind ("openai" means any OpenAI-compatible endpoint).
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier for chat requests.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key. `None` requires an environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the chat completions endpoint.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Sampling temperature, clamped to [0.0, 2.0] at the provider.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            base_url: default_llm_base_url(),
            temperature: default_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_llm_max_tokens() -> u32 {
    4096
}

fn default_llm_timeout_secs() -> u64 {
    120
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Provider kind: "hash" (deterministic, local) or "openai".
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Embedding model identifier (ignored by the hash provider).
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key for HTTP providers.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL for HTTP providers.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Fixed vector dimensionality.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            base_url: default_llm_base_url(),
            dimensions: default_dimensions(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    384
}

/// Memory system configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Which memory types are active for the manager.
    #[serde(default = "default_enabled_types")]
    pub enabled_types: Vec<String>,

    /// Working memory capacity before eviction.
    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,

    /// Working memory TTL in minutes.
    #[serde(default = "default_working_ttl_minutes")]
    pub working_ttl_minutes: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled_types: default_enabled_types(),
            working_capacity: default_working_capacity(),
            working_ttl_minutes: default_working_ttl_minutes(),
        }
    }
}

fn default_enabled_types() -> Vec<String> {
    vec![
        "working".to_string(),
        "episodic".to_string(),
        "semantic".to_string(),
        "perceptual".to_string(),
    ]
}

fn default_working_capacity() -> usize {
    50
}

fn default_working_ttl_minutes() -> u64 {
    60
}

/// RAG pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RagConfig {
    /// Target chunk size in tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in tokens.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Enable multi-query expansion by default.
    #[serde(default)]
    pub enable_mqe: bool,

    /// Enable hypothetical document embeddings by default.
    #[serde(default)]
    pub enable_hyde: bool,

    /// Default number of results per search.
    #[serde(default = "default_rag_k")]
    pub k: usize,

    /// Minimum similarity score for returned hits.
    #[serde(default)]
    pub min_score: f64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            enable_mqe: false,
            enable_hyde: false,
            k: default_rag_k(),
            min_score: 0.0,
        }
    }
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    64
}

fn default_rag_k() -> usize {
    5
}

/// Context builder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Hard token cap for the built prompt.
    #[serde(default = "default_context_max_tokens")]
    pub max_tokens: usize,

    /// Fraction of the budget reserved for the user query and model reply.
    #[serde(default = "default_reserve_ratio")]
    pub reserve_ratio: f64,

    /// Relevance floor for included packets.
    #[serde(default)]
    pub min_relevance: f64,

    /// Compress long history turns via LLM summarisation.
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,

    /// Maximum history turns considered.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// When true, only caller-supplied packets are used; no auto retrieval.
    #[serde(default = "default_lazy_fetch")]
    pub lazy_fetch: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_context_max_tokens(),
            reserve_ratio: default_reserve_ratio(),
            min_relevance: 0.0,
            enable_compression: default_enable_compression(),
            max_history_turns: default_max_history_turns(),
            lazy_fetch: default_lazy_fetch(),
        }
    }
}

fn default_context_max_tokens() -> usize {
    8_000
}

fn default_reserve_ratio() -> f64 {
    0.2
}

fn default_enable_compression() -> bool {
    true
}

fn default_max_history_turns() -> usize {
    10
}

fn default_lazy_fetch() -> bool {
    true
}

/// ReAct engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReactConfig {
    /// Maximum Think/Act/Observe steps per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Observations longer than this are LLM-summarised before entering
    /// the model-visible trace.
    #[serde(default = "default_summarise_threshold_chars")]
    pub summarise_threshold_chars: usize,
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            summarise_threshold_chars: default_summarise_threshold_chars(),
        }
    }
}

fn default_max_steps() -> usize {
    10
}

fn default_summarise_threshold_chars() -> usize {
    1_800
}

/// Persisted state layout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// State root directory holding notes/, memory/, sessions/, logs/.
    #[serde(default = "default_state_root")]
    pub root: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            root: default_state_root(),
        }
    }
}

fn default_state_root() -> String {
    ".mnemon".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MnemonConfig::default();
        config.validate().unwrap();
        assert_eq!(config.memory.working_capacity, 50);
        assert_eq!(config.memory.working_ttl_minutes, 60);
        assert_eq!(config.context.reserve_ratio, 0.2);
        assert_eq!(config.react.summarise_threshold_chars, 1_800);
        assert_eq!(config.state.root, ".mnemon");
    }

    #[test]
    fn validate_rejects_bad_reserve_ratio() {
        let mut config = MnemonConfig::default();
        config.context.reserve_ratio = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_overlap_ge_chunk_size() {
        let mut config = MnemonConfig::default();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_memory_type() {
        let mut config = MnemonConfig::default();
        config.memory.enabled_types.push("procedural".into());
        assert!(config.validate().is_err());
    }
}
