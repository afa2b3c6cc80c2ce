// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan tool: asks the model for a short numbered step list for a goal.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::traits::ChatClient;
use mnemon_core::types::{ChatMessage, InvokeOptions};

use crate::tool::{ParamKind, Parameter, Tool};

const PLAN_PROMPT: &str = "Break the goal below into a short numbered plan of 3 to 7 concrete \
steps. Reply with the numbered steps only, one per line, no preamble.";

pub struct PlanTool {
    chat: Arc<dyn ChatClient>,
}

impl PlanTool {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Tool for PlanTool {
    fn name(&self) -> &str {
        "plan"
    }

    fn description(&self) -> &str {
        "Drafts a numbered step-by-step plan for a stated goal."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![Parameter::required(
            "goal",
            ParamKind::String,
            "the goal to plan for",
        )]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let goal = params
            .get("goal")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim();
        if goal.is_empty() {
            return Err(MnemonError::Tool("plan requires a goal".into()));
        }
        let messages = [
            ChatMessage::system(PLAN_PROMPT),
            ChatMessage::user(goal),
        ];
        let reply = self.chat.invoke(&messages, &InvokeOptions::default()).await?;

        // Keep only lines that look like numbered steps; renumber so the
        // output is stable even when the model drifts.
        let steps: Vec<&str> = reply
            .lines()
            .map(str::trim)
            .filter(|line| {
                line.chars().next().is_some_and(|c| c.is_ascii_digit())
                    || line.starts_with("- ")
            })
            .collect();
        if steps.is_empty() {
            return Ok(reply.trim().to_string());
        }
        Ok(steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let body = step
                    .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                    .trim_start_matches("- ")
                    .trim();
                format!("{}. {}", i + 1, body)
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_test_utils::MockChatClient;
    use serde_json::json;

    fn goal_params(goal: &str) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("goal".into(), json!(goal));
        map
    }

    #[tokio::test]
    async fn renumbers_model_steps() {
        let chat = MockChatClient::new([
            "Sure, here is a plan:\n2) gather sources\n5) write draft\n7) review",
        ]);
        let tool = PlanTool::new(Arc::new(chat));
        let out = tool.run(goal_params("write a report")).await.unwrap();
        assert_eq!(out, "1. gather sources\n2. write draft\n3. review");
    }

    #[tokio::test]
    async fn unstructured_reply_passes_through() {
        let chat = MockChatClient::new(["just do it"]);
        let tool = PlanTool::new(Arc::new(chat));
        let out = tool.run(goal_params("x")).await.unwrap();
        assert_eq!(out, "just do it");
    }

    #[tokio::test]
    async fn empty_goal_refused() {
        let chat = MockChatClient::default();
        let tool = PlanTool::new(Arc::new(chat));
        assert!(tool.run(goal_params("  ")).await.is_err());
    }
}
