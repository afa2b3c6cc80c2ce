// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge tool: bridges the ReAct loop to the document retriever.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;
use mnemon_rag::{Retriever, SearchOptions};

use crate::tool::{ParamKind, Parameter, Tool};

pub struct RagTool {
    retriever: Arc<Retriever>,
    namespace: String,
}

impl RagTool {
    pub fn new(retriever: Arc<Retriever>, namespace: impl Into<String>) -> Self {
        Self {
            retriever,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl Tool for RagTool {
    fn name(&self) -> &str {
        "knowledge"
    }

    fn description(&self) -> &str {
        "Searches the ingested document base and answers questions with citations."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::required("query", ParamKind::String, "what to look up"),
            Parameter::optional(
                "mode",
                ParamKind::String,
                Value::from("search"),
                "search returns raw chunks, ask returns a cited answer",
            ),
            Parameter::optional("k", ParamKind::Integer, Value::from(5), "result count"),
        ]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let query = params.get("query").and_then(Value::as_str).unwrap_or("");
        let opts = SearchOptions {
            k: params.get("k").and_then(Value::as_u64).unwrap_or(5) as usize,
            ..SearchOptions::default()
        };
        match params.get("mode").and_then(Value::as_str).unwrap_or("search") {
            "ask" => {
                self.retriever
                    .ask(&self.namespace, query, &opts)
                    .await
                    .map_err(|e| MnemonError::Tool(e.to_string()))
            }
            "search" => {
                let chunks = self
                    .retriever
                    .search_chunks(&self.namespace, query, &opts)
                    .await
                    .map_err(|e| MnemonError::Tool(e.to_string()))?;
                if chunks.is_empty() {
                    return Ok("no matching documents".into());
                }
                Ok(chunks
                    .iter()
                    .map(|c| {
                        format!("[source: {}#{}] {}", c.document_id, c.ordinal, c.text)
                    })
                    .collect::<Vec<_>>()
                    .join("\n---\n"))
            }
            other => Err(MnemonError::Tool(format!(
                "unknown knowledge mode {other:?}"
            ))),
        }
    }
}
