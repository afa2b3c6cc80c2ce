// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory tool: bridges the ReAct loop to the memory manager.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_core::types::MemoryType;
use mnemon_memory::MemoryManager;

use crate::tool::{ParamKind, Parameter, Tool};

pub struct MemoryTool {
    manager: Arc<MemoryManager>,
}

impl MemoryTool {
    pub fn new(manager: Arc<MemoryManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn description(&self) -> &str {
        "Stores and recalls long-lived facts about the user and past sessions."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::required(
                "action",
                ParamKind::String,
                "one of add, search, summary, stats",
            ),
            Parameter::optional("content", ParamKind::String, Value::from(""), "text to store"),
            Parameter::optional("query", ParamKind::String, Value::from(""), "search text"),
            Parameter::optional(
                "memory_type",
                ParamKind::String,
                Value::from("working"),
                "working, episodic, semantic, or perceptual",
            ),
            Parameter::optional(
                "importance",
                ParamKind::Number,
                Value::from(0.5),
                "importance in [0, 1]",
            ),
        ]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let get = |key: &str| params.get(key).and_then(Value::as_str).unwrap_or("");
        match get("action") {
            "add" => {
                let content = get("content");
                if content.is_empty() {
                    return Err(MnemonError::Tool("add requires content".into()));
                }
                let memory_type = MemoryType::from_str_value(get("memory_type"));
                let importance = params
                    .get("importance")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.5);
                let id = self
                    .manager
                    .add(content, memory_type, importance, serde_json::Map::new())
                    .await
                    .map_err(|e| MnemonError::Tool(e.to_string()))?;
                Ok(format!("remembered as {id}"))
            }
            "search" => {
                let items = self
                    .manager
                    .search(get("query"), None, 5, 0.0)
                    .await
                    .map_err(|e| MnemonError::Tool(e.to_string()))?;
                if items.is_empty() {
                    return Ok("nothing relevant in memory".into());
                }
                Ok(items
                    .iter()
                    .map(|i| format!("[{}] {}", i.memory_type.as_str(), i.content))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            "summary" => self
                .manager
                .summary(3)
                .await
                .map_err(|e| MnemonError::Tool(e.to_string())),
            "stats" => {
                let stats = self
                    .manager
                    .stats()
                    .await
                    .map_err(|e| MnemonError::Tool(e.to_string()))?;
                Ok(format!(
                    "{} items, {} tokens, per type: {:?}",
                    stats.total_items, stats.total_tokens, stats.counts
                ))
            }
            other => Err(MnemonError::Tool(format!(
                "unknown memory action {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemon_embed::HashEmbedder;
    use mnemon_store::MemStore;
    use serde_json::json;

    fn tool() -> MemoryTool {
        MemoryTool::new(Arc::new(MemoryManager::with_stores(
            Arc::new(MemStore::new()),
            Arc::new(HashEmbedder::new(64)),
            "u1",
            &MemoryType::all(),
            50,
            60,
        )))
    }

    #[tokio::test]
    async fn add_then_search_finds_it() {
        let tool = tool();
        let mut add = serde_json::Map::new();
        add.insert("action".into(), json!("add"));
        add.insert("content".into(), json!("the user lives in berlin"));
        add.insert("memory_type".into(), json!("semantic"));
        add.insert("importance".into(), json!(0.8));
        let out = tool.run(add).await.unwrap();
        assert!(out.starts_with("remembered as "));

        let mut search = serde_json::Map::new();
        search.insert("action".into(), json!("search"));
        search.insert("query".into(), json!("where does the user live"));
        let hits = tool.run(search).await.unwrap();
        assert!(hits.contains("berlin"));
    }

    #[tokio::test]
    async fn add_without_content_is_refused() {
        let tool = tool();
        let mut add = serde_json::Map::new();
        add.insert("action".into(), json!("add"));
        let err = tool.run(add).await.unwrap_err();
        assert!(matches!(err, MnemonError::Tool(_)));
    }
}
