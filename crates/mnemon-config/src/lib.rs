// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Mnemon core: TOML files merged with
//! `MNEMON_` environment variable overrides, validated at startup.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    ContextConfig, EmbeddingConfig, LlmConfig, MemoryConfig, MnemonConfig, RagConfig,
    ReactConfig, StateConfig,
};
