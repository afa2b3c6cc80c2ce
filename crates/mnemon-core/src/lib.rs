// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core types and adapter traits for the Mnemon agent context & memory core.
//!
//! Everything the other crates share lives here: the workspace error enum,
//! the chat/embedding/store adapter traits, the memory/document/context
//! data model, and token counting.

pub mod error;
pub mod tokens;
pub mod traits;
pub mod types;

pub use error::MnemonError;
