// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./mnemon.toml` > `~/.config/mnemon/mnemon.toml` with
//! environment variable overrides via the `MNEMON_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MnemonConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `~/.config/mnemon/mnemon.toml` (user XDG config)
/// 3. `./mnemon.toml` (local directory)
/// 4. `MNEMON_*` environment variables
pub fn load_config() -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("mnemon/mnemon.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("mnemon.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no file lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MnemonConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MnemonConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity
/// with underscore-containing key names: `MNEMON_LLM_API_KEY` must map
/// to `llm.api_key`, not `llm.api.key`.
fn env_provider() -> Env {
    Env::prefixed("MNEMON_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("llm_", "llm.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("rag_", "rag.", 1)
            .replacen("context_", "context.", 1)
            .replacen("react_", "react.", 1)
            .replacen("state_", "state.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [llm]
            model = "gpt-4.1"
            temperature = 0.2

            [rag]
            chunk_size = 256
            chunk_overlap = 32
            enable_hyde = true

            [context]
            max_tokens = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.rag.chunk_size, 256);
        assert!(config.rag.enable_hyde);
        assert_eq!(config.context.max_tokens, 3000);
        // Untouched sections keep their defaults.
        assert_eq!(config.memory.working_capacity, 50);
    }

    #[test]
    fn load_from_str_rejects_unknown_key() {
        let result = load_config_from_str(
            r#"
            [llm]
            modle = "typo"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.react.max_steps, 10);
    }
}
