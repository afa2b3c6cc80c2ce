// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ReAct loop: think/act/observe over a chat client and a tool
//! registry, with total-function output parsing, observation
//! summarisation, a hard step budget, and cooperative cancellation.

pub mod engine;
pub mod parser;
pub mod trace;

pub use engine::{CANCELLED_MARKER, ReActEngine, RunOutcome};
pub use parser::{ParsedStep, StepDecision, parse};
pub use trace::TraceEntry;
