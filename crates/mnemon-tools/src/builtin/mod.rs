// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools.

pub mod memory;
pub mod note;
pub mod plan;
pub mod rag;
pub mod terminal;
pub mod todo;
pub mod web_search;

pub use memory::MemoryTool;
pub use note::NoteTool;
pub use plan::PlanTool;
pub use rag::RagTool;
pub use terminal::TerminalTool;
pub use todo::TodoTool;
pub use web_search::{SearchBackend, SearchHit, WebSearchTool};
