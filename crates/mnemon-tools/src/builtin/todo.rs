// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Todo tool: an in-process task board scoped to one agent run.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;

use crate::tool::{ParamKind, Parameter, Tool};

#[derive(Debug, Clone)]
struct TodoEntry {
    id: usize,
    text: String,
    done: bool,
}

/// Board state lives only as long as the tool instance.
#[derive(Default)]
pub struct TodoTool {
    entries: Mutex<Vec<TodoEntry>>,
    next_id: Mutex<usize>,
}

impl TodoTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TodoEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn render(entries: &[TodoEntry]) -> String {
        if entries.is_empty() {
            return "the board is empty".into();
        }
        entries
            .iter()
            .map(|e| format!("{}. [{}] {}", e.id, if e.done { "x" } else { " " }, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Tool for TodoTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn description(&self) -> &str {
        "Tracks a short task list for the current run."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::required(
                "action",
                ParamKind::String,
                "one of add, list, done, remove",
            ),
            Parameter::optional("text", ParamKind::String, Value::from(""), "task text for add"),
            Parameter::optional("id", ParamKind::Integer, Value::from(0), "task id for done/remove"),
        ]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let action = params.get("action").and_then(Value::as_str).unwrap_or("");
        let id = params.get("id").and_then(Value::as_u64).unwrap_or(0) as usize;
        match action {
            "add" => {
                let text = params
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if text.is_empty() {
                    return Err(MnemonError::Tool("add requires text".into()));
                }
                let mut next = self.next_id.lock().unwrap_or_else(|p| p.into_inner());
                *next += 1;
                let id = *next;
                drop(next);
                self.lock().push(TodoEntry {
                    id,
                    text,
                    done: false,
                });
                Ok(format!("added task {id}"))
            }
            "list" => Ok(Self::render(&self.lock())),
            "done" => {
                let mut entries = self.lock();
                match entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => {
                        entry.done = true;
                        Ok(format!("task {id} done"))
                    }
                    None => Err(MnemonError::Tool(format!("no task with id {id}"))),
                }
            }
            "remove" => {
                let mut entries = self.lock();
                let before = entries.len();
                entries.retain(|e| e.id != id);
                if entries.len() == before {
                    return Err(MnemonError::Tool(format!("no task with id {id}")));
                }
                Ok(format!("task {id} removed"))
            }
            other => Err(MnemonError::Tool(format!("unknown todo action {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, Value)]) -> serde_json::Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn add_done_list_flow() {
        let tool = TodoTool::new();
        tool.run(params(&[("action", json!("add")), ("text", json!("write tests"))]))
            .await
            .unwrap();
        tool.run(params(&[("action", json!("add")), ("text", json!("ship it"))]))
            .await
            .unwrap();
        tool.run(params(&[("action", json!("done")), ("id", json!(1))]))
            .await
            .unwrap();

        let board = tool.run(params(&[("action", json!("list"))])).await.unwrap();
        assert!(board.contains("1. [x] write tests"));
        assert!(board.contains("2. [ ] ship it"));
    }

    #[tokio::test]
    async fn remove_unknown_id_is_an_error() {
        let tool = TodoTool::new();
        let err = tool
            .run(params(&[("action", json!("remove")), ("id", json!(9))]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no task"));
    }

    #[tokio::test]
    async fn empty_board_lists_cleanly() {
        let tool = TodoTool::new();
        let board = tool.run(params(&[("action", json!("list"))])).await.unwrap();
        assert_eq!(board, "the board is empty");
    }
}
