// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-budgeted context assembly for prompts: system instructions,
//! retrieved knowledge, memory, tool evidence, history, query.

pub mod builder;

pub use builder::{BuildRequest, ContextBuilder, ContextBuilderConfig};
