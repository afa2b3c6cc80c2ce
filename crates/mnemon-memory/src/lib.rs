// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-store memory system: working, episodic, semantic, and
//! perceptual memory behind a single per-user manager.

mod durable;

pub mod episodic;
pub mod manager;
pub mod perceptual;
pub mod ranking;
pub mod semantic;
pub mod store;
pub mod working;

pub use episodic::EpisodicMemory;
pub use manager::{ForgetStrategy, MemoryManager, MemoryStats};
pub use perceptual::PerceptualMemory;
pub use semantic::SemanticMemory;
pub use store::{MemoryPatch, MemoryStore, ScoredItem};
pub use working::WorkingMemory;
