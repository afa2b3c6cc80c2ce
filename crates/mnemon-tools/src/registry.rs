// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool registry: name lookup, prompt-facing descriptions, and
//! parameter validation ahead of execution.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::debug;

use mnemon_core::MnemonError;

use crate::tool::Tool;

/// Raw tool input as parsed from model output.
#[derive(Debug, Clone)]
pub enum ToolInput {
    /// A bare string, mapped to the tool's first required parameter.
    Text(String),
    /// An explicit parameter map.
    Map(serde_json::Map<String, Value>),
}

impl From<&str> for ToolInput {
    fn from(s: &str) -> Self {
        ToolInput::Text(s.to_string())
    }
}

impl From<Value> for ToolInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ToolInput::Map(map),
            Value::String(s) => ToolInput::Text(s),
            other => ToolInput::Text(other.to_string()),
        }
    }
}

/// Registry of available tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any prior tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        debug!(name = tool.name(), "tool registered");
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Renders every tool for inclusion in the ReAct system prompt.
    pub fn describe_all(&self) -> String {
        let mut out = String::new();
        for name in self.list() {
            let tool = &self.tools[&name];
            out.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
            for param in tool.parameters() {
                out.push_str(&format!(
                    "    {} ({}{}): {}\n",
                    param.name,
                    param.kind.as_str(),
                    if param.required { ", required" } else { "" },
                    param.description
                ));
            }
        }
        out.trim_end().to_string()
    }

    /// Validates input against the tool's schema and runs it.
    ///
    /// Missing required parameters are rejected before the tool is
    /// called. Defaults are filled in for absent optional parameters.
    pub async fn execute(&self, name: &str, input: ToolInput) -> Result<String, MnemonError> {
        let tool = self
            .get(name)
            .ok_or_else(|| MnemonError::Tool(format!("unknown tool: {name}")))?;
        let params = coerce_params(&tool, input)?;
        counter!("mnemon_tool_invocations_total", "tool" => name.to_string()).increment(1);
        tool.run(params).await
    }
}

/// Maps raw input onto the tool's declared parameters.
fn coerce_params(
    tool: &Arc<dyn Tool>,
    input: ToolInput,
) -> Result<serde_json::Map<String, Value>, MnemonError> {
    let declared = tool.parameters();
    let mut params = match input {
        ToolInput::Map(map) => map,
        ToolInput::Text(text) => {
            // A single string binds to the first required parameter,
            // falling back to the first declared one.
            let target = declared
                .iter()
                .find(|p| p.required)
                .or_else(|| declared.first())
                .ok_or_else(|| {
                    MnemonError::Tool(format!(
                        "tool {} takes no parameters but got input {text:?}",
                        tool.name()
                    ))
                })?;
            let mut map = serde_json::Map::new();
            map.insert(target.name.to_string(), Value::String(text));
            map
        }
    };

    for param in &declared {
        match params.get(param.name) {
            None if param.required => {
                return Err(MnemonError::Tool(format!(
                    "tool {} missing required parameter {:?}",
                    tool.name(),
                    param.name
                )));
            }
            None => {
                if let Some(default) = &param.default {
                    params.insert(param.name.to_string(), default.clone());
                }
            }
            Some(value) if !param.kind.accepts(value) => {
                // Coerce string scalars the model quoted.
                let coerced = value
                    .as_str()
                    .and_then(|s| coerce_scalar(param.kind, s));
                match coerced {
                    Some(coerced) => {
                        params.insert(param.name.to_string(), coerced);
                    }
                    None => {
                        return Err(MnemonError::Tool(format!(
                            "tool {} parameter {:?} expects {}",
                            tool.name(),
                            param.name,
                            param.kind.as_str()
                        )));
                    }
                }
            }
            Some(_) => {}
        }
    }
    Ok(params)
}

fn coerce_scalar(kind: crate::tool::ParamKind, raw: &str) -> Option<Value> {
    use crate::tool::ParamKind;
    match kind {
        ParamKind::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
        ParamKind::Number => raw.trim().parse::<f64>().ok().map(Value::from),
        ParamKind::Boolean => raw.trim().parse::<bool>().ok().map(Value::from),
        ParamKind::Object => serde_json::from_str(raw).ok(),
        ParamKind::String => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParamKind, Parameter, Tool};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes its message back."
        }
        fn parameters(&self) -> Vec<Parameter> {
            vec![
                Parameter::required("message", ParamKind::String, "text to echo"),
                Parameter::optional("repeat", ParamKind::Integer, Value::from(1), "repetitions"),
            ]
        }
        async fn run(
            &self,
            params: serde_json::Map<String, Value>,
        ) -> Result<String, MnemonError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let message = params.get("message").and_then(Value::as_str).unwrap_or("");
            let repeat = params.get("repeat").and_then(Value::as_i64).unwrap_or(1);
            Ok(vec![message; repeat.max(0) as usize].join(" "))
        }
    }

    fn registry_with_echo() -> (ToolRegistry, Arc<EchoTool>) {
        let tool = Arc::new(EchoTool {
            calls: AtomicUsize::new(0),
        });
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());
        (registry, tool)
    }

    #[tokio::test]
    async fn string_input_binds_first_required_param() {
        let (registry, _) = registry_with_echo();
        let out = registry.execute("echo", "hello".into()).await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn missing_required_param_never_calls_tool() {
        let (registry, tool) = registry_with_echo();
        let err = registry
            .execute("echo", ToolInput::Map(serde_json::Map::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MnemonError::Tool(_)));
        assert!(err.to_string().contains("message"));
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn defaults_are_applied() {
        let (registry, _) = registry_with_echo();
        let mut map = serde_json::Map::new();
        map.insert("message".into(), Value::from("hi"));
        let out = registry.execute("echo", ToolInput::Map(map)).await.unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn quoted_integers_are_coerced() {
        let (registry, _) = registry_with_echo();
        let mut map = serde_json::Map::new();
        map.insert("message".into(), Value::from("hi"));
        map.insert("repeat".into(), Value::from("3"));
        let out = registry.execute("echo", ToolInput::Map(map)).await.unwrap();
        assert_eq!(out, "hi hi hi");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let (registry, _) = registry_with_echo();
        let err = registry.execute("nope", "x".into()).await.unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn describe_all_lists_parameters() {
        let (registry, _) = registry_with_echo();
        let description = registry.describe_all();
        assert!(description.contains("- echo: Echoes its message back."));
        assert!(description.contains("message (string, required)"));
        assert!(description.contains("repeat (integer)"));
    }
}
