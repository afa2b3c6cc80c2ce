// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run trace records.

/// One think/act/observe step as seen by the engine.
///
/// `observation_raw` always holds the full tool output; when the engine
/// summarised it for the model, the summary is kept alongside.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// 1-based step number.
    pub step: usize,
    pub thought: String,
    pub tool_name: Option<String>,
    pub tool_input: Option<String>,
    pub observation_raw: String,
    pub observation_summary: Option<String>,
}

impl TraceEntry {
    /// The observation text that was shown to the model.
    pub fn observation_shown(&self) -> &str {
        self.observation_summary
            .as_deref()
            .unwrap_or(&self.observation_raw)
    }
}
