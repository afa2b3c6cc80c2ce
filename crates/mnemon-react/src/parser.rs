// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step-decision parsing for model output.
//!
//! The model may answer in a fenced JSON block, bare JSON, a bracketed
//! `Finish[...]` line, or the plain `Thought:/Action:` form, in English
//! or Chinese. Parsing is a pure total function: anything unreadable
//! becomes [`StepDecision::Invalid`] rather than an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// What the model asked for in one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDecision {
    /// Terminal answer; the engine returns the payload verbatim.
    Finish(String),
    /// Invoke a tool with the given raw input.
    Act { tool_name: String, tool_input: Value },
    /// Unreadable output; counts as one wasted step.
    Invalid(String),
}

/// One parsed model reply: the stated thought plus the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStep {
    pub thought: String,
    pub decision: StepDecision,
}

static FINISH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(?:Finish|结束)\s*\[(.*)\]").unwrap());
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:Action|行动)\s*[:：]\s*([A-Za-z0-9_\-]+)\s*\[(.*)\]\s*$").unwrap()
});
static THOUGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:Thought|思考)\s*[:：]\s*(.*)$").unwrap());

/// Parses one model reply with fixed precedence: fenced JSON, then bare
/// JSON, then a `Finish[...]` wrapper, then the plain-text form.
pub fn parse(raw: &str) -> ParsedStep {
    if let Some(json) = fenced_json(raw)
        && let Some(step) = parse_json_step(&json)
    {
        return step;
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('{')
        && let Some(step) = parse_json_step(trimmed)
    {
        return step;
    }

    let thought = THOUGHT_RE
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    if let Some(captures) = FINISH_RE.captures(raw) {
        let payload = captures[1].trim();
        if !payload.is_empty() {
            return ParsedStep {
                thought,
                decision: StepDecision::Finish(payload.to_string()),
            };
        }
    }
    if let Some(captures) = ACTION_RE.captures(raw) {
        return ParsedStep {
            thought,
            decision: StepDecision::Act {
                tool_name: captures[1].to_string(),
                tool_input: Value::String(captures[2].trim().to_string()),
            },
        };
    }
    ParsedStep {
        thought,
        decision: StepDecision::Invalid(raw.to_string()),
    }
}

/// Extracts the body of the first ```json fence, if any.
fn fenced_json(raw: &str) -> Option<String> {
    let start = raw.find("```json")? + "```json".len();
    let rest = &raw[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim().to_string())
}

/// Interprets a JSON object of the `{"Thought", "Action", "Finish"}`
/// shape. Exactly one of a non-empty Action or a non-empty Finish must
/// be present; anything else is Invalid.
fn parse_json_step(raw: &str) -> Option<ParsedStep> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let thought = object
        .get("Thought")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let finish = match object.get("Finish") {
        Some(Value::Array(parts)) if !parts.is_empty() => Some(
            parts
                .iter()
                .map(|p| match p {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };
    let action = object.get("Action").and_then(Value::as_object).and_then(|a| {
        let tool_name = a.get("tool_name").and_then(Value::as_str)?;
        if tool_name.is_empty() {
            return None;
        }
        Some((
            tool_name.to_string(),
            a.get("tool_input").cloned().unwrap_or(Value::Null),
        ))
    });

    let decision = match (finish, action) {
        (Some(_), Some(_)) | (None, None) => StepDecision::Invalid(raw.to_string()),
        (Some(payload), None) => StepDecision::Finish(payload),
        (None, Some((tool_name, tool_input))) => StepDecision::Act {
            tool_name,
            tool_input,
        },
    };
    Some(ParsedStep { thought, decision })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_takes_precedence() {
        let raw = "Thought: ignore this\n```json\n{\"Thought\":\"t\",\"Action\":{\"tool_name\":\"echo\",\"tool_input\":\"hi\"},\"Finish\":[]}\n```\nFinish[nope]";
        let step = parse(raw);
        assert_eq!(step.thought, "t");
        assert_eq!(
            step.decision,
            StepDecision::Act {
                tool_name: "echo".into(),
                tool_input: json!("hi"),
            }
        );
    }

    #[test]
    fn bare_json_finish() {
        let step = parse(r#"{"Thought":"done","Action":{},"Finish":["42"]}"#);
        assert_eq!(step.decision, StepDecision::Finish("42".into()));
    }

    #[test]
    fn json_finish_list_is_joined() {
        let step = parse(r#"{"Finish":["a","b"]}"#);
        assert_eq!(step.decision, StepDecision::Finish("a\nb".into()));
    }

    #[test]
    fn json_with_both_action_and_finish_is_invalid() {
        let step = parse(
            r#"{"Action":{"tool_name":"echo","tool_input":"x"},"Finish":["done"]}"#,
        );
        assert!(matches!(step.decision, StepDecision::Invalid(_)));
    }

    #[test]
    fn finish_wrapper() {
        let step = parse("Thought: that's it\nFinish[the answer]");
        assert_eq!(step.thought, "that's it");
        assert_eq!(step.decision, StepDecision::Finish("the answer".into()));
    }

    #[test]
    fn plain_text_action() {
        let step = parse("Thought: need to look\nAction: terminal[ls -la]");
        assert_eq!(step.thought, "need to look");
        assert_eq!(
            step.decision,
            StepDecision::Act {
                tool_name: "terminal".into(),
                tool_input: json!("ls -la"),
            }
        );
    }

    #[test]
    fn chinese_forms() {
        let step = parse("思考：查一下天气\n行动：web_search[上海 天气]");
        assert_eq!(step.thought, "查一下天气");
        assert_eq!(
            step.decision,
            StepDecision::Act {
                tool_name: "web_search".into(),
                tool_input: json!("上海 天气"),
            }
        );

        let step = parse("结束[好的，完成了]");
        assert_eq!(step.decision, StepDecision::Finish("好的，完成了".into()));
    }

    #[test]
    fn object_tool_input_survives() {
        let step = parse(
            r#"{"Action":{"tool_name":"note","tool_input":{"action":"list"}}}"#,
        );
        match step.decision {
            StepDecision::Act { tool_name, tool_input } => {
                assert_eq!(tool_name, "note");
                assert_eq!(tool_input, json!({"action": "list"}));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(matches!(
            parse("I think I'll just chat instead.").decision,
            StepDecision::Invalid(_)
        ));
        assert!(matches!(parse("").decision, StepDecision::Invalid(_)));
    }

    #[test]
    fn empty_finish_list_is_not_terminal() {
        // An empty Finish with an empty Action parses as invalid.
        let step = parse(r#"{"Thought":"hmm","Action":{},"Finish":[]}"#);
        assert!(matches!(step.decision, StepDecision::Invalid(_)));
    }
}
