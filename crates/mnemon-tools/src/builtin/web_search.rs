// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web search tool with a pluggable backend. Without a configured
//! backend the tool registers but refuses to run, so the model gets a
//! clear observation instead of fabricated results.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemon_core::MnemonError;

use crate::tool::{ParamKind, Parameter, Tool};

/// One search hit as rendered to the model.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Provider seam for search engines.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, MnemonError>;
}

pub struct WebSearchTool {
    backend: Option<Arc<dyn SearchBackend>>,
}

impl WebSearchTool {
    pub fn new(backend: Option<Arc<dyn SearchBackend>>) -> Self {
        Self { backend }
    }

    /// A tool that always reports itself as unconfigured.
    pub fn unconfigured() -> Self {
        Self { backend: None }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web and returns titled results with snippets."
    }

    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::required("query", ParamKind::String, "search terms"),
            Parameter::optional("k", ParamKind::Integer, Value::from(5), "result count"),
        ]
    }

    async fn run(&self, params: serde_json::Map<String, Value>) -> Result<String, MnemonError> {
        let Some(backend) = &self.backend else {
            return Err(MnemonError::Tool(
                "web search is not configured; no backend available".into(),
            ));
        };
        let query = params.get("query").and_then(Value::as_str).unwrap_or("");
        let k = params.get("k").and_then(Value::as_u64).unwrap_or(5) as usize;
        let hits = backend.search(query, k).await?;
        if hits.is_empty() {
            return Ok("no results".into());
        }
        Ok(hits
            .iter()
            .map(|h| format!("{}\n{}\n{}", h.title, h.url, h.snippet))
            .collect::<Vec<_>>()
            .join("\n---\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticBackend;

    #[async_trait]
    impl SearchBackend for StaticBackend {
        async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, MnemonError> {
            Ok(vec![SearchHit {
                title: format!("about {query}"),
                url: "https://example.org/a".into(),
                snippet: "a snippet".into(),
            }]
            .into_iter()
            .take(k)
            .collect())
        }
    }

    fn query_params(query: &str) -> serde_json::Map<String, Value> {
        let mut map = serde_json::Map::new();
        map.insert("query".into(), json!(query));
        map
    }

    #[tokio::test]
    async fn backend_results_are_rendered() {
        let tool = WebSearchTool::new(Some(Arc::new(StaticBackend)));
        let out = tool.run(query_params("rust")).await.unwrap();
        assert!(out.contains("about rust"));
        assert!(out.contains("https://example.org/a"));
    }

    #[tokio::test]
    async fn unconfigured_backend_is_refused() {
        let tool = WebSearchTool::unconfigured();
        let err = tool.run(query_params("rust")).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
