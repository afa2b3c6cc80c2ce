// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sandboxed terminal tool: a fixed whitelist of read-only commands,
//! time-bounded execution, combined stdout/stderr observation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use mnemon_core::MnemonError;

use crate::tool::{ParamKind, Parameter, Tool};

/// Commands the tool will run. Everything else is refused.
const WHITELIST: &[&str] = &[
    "ls", "cat", "echo", "pwd", "grep", "head", "tail", "wc", "date", "find", "which",
];

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct TerminalTool {
    timeout: Duration,
}

impl TerminalTool {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for TerminalTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Runs a whitelisted read-only shell command and returns its output."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::required(
            "command",
            ParamKind::String,
            "command line to execute, e.g. `ls -la`",
        )]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let command_line = params
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(MnemonError::Tool("empty command".into()));
        };
        if !WHITELIST.contains(&program) {
            return Err(MnemonError::Tool(format!(
                "command {program:?} is not in the whitelist: {}",
                WHITELIST.join(", ")
            )));
        }
        // Shell metacharacters would escape the whitelist via the first word.
        if command_line.contains(['|', ';', '&', '>', '<', '`', '$']) {
            return Err(MnemonError::Tool(
                "shell operators are not allowed".into(),
            ));
        }

        debug!(%command_line, "terminal tool executing");
        let args: Vec<&str> = parts.collect();
        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program).args(&args).output(),
        )
        .await
        .map_err(|_| MnemonError::Tool(format!("command timed out after {:?}", self.timeout)))?
        .map_err(|e| MnemonError::Tool(format!("failed to spawn {program}: {e}")))?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.stderr.is_empty() {
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        if !output.status.success() {
            text.push_str(&format!("\n(exit status: {})", output.status));
        }
        Ok(text.trim_end().to_string())
    }
}
