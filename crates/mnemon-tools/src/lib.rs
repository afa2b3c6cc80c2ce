// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool abstraction and built-in tools: a named, schema-validated
//! function surface the ReAct engine can call, plus the registry that
//! validates inputs before execution.

pub mod builtin;
pub mod registry;
pub mod tool;

pub use registry::{ToolInput, ToolRegistry};
pub use tool::{ParamKind, Parameter, Tool};
