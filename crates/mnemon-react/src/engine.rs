// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ReAct engine: a think/act/observe loop over a chat client and a
//! tool registry, with observation summarisation, a hard step budget,
//! and cooperative cancellation.

use std::sync::Arc;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mnemon_core::MnemonError;
use mnemon_core::traits::ChatClient;
use mnemon_core::types::{ChatMessage, InvokeOptions};
use mnemon_tools::ToolRegistry;

use crate::parser::{StepDecision, parse};
use crate::trace::TraceEntry;

const DEFAULT_MAX_STEPS: usize = 10;
const DEFAULT_SUMMARISE_THRESHOLD_CHARS: usize = 1_800;

/// Returned when the run is cancelled before completion.
pub const CANCELLED_MARKER: &str = "cancelled";

/// Returned when the step budget runs out without a final answer.
const APOLOGY: &str =
    "I could not finish within the allowed number of steps. Please try rephrasing the request.";

const SYSTEM_TEMPLATE: &str = "You are a tool-using assistant. Work in steps. In each step, \
reply with exactly one JSON object of the form\n\
{\"Thought\": \"<your reasoning>\",\n \"Action\": {\"tool_name\": \"<name>\", \"tool_input\": <string or object>},\n \"Finish\": []}\n\
To finish, leave Action empty and put your final answer into the Finish list. \
Use exactly one of Action or Finish per step.\n\nAvailable tools:\n";

const FINALISE_PROMPT: &str = "You are out of steps. Produce your final answer now from what \
you have learned so far, as {\"Finish\": [\"<answer>\"]}.";

const SUMMARISE_PROMPT: &str = "Summarise the tool output below in a few sentences, keeping \
every number, identifier, and error message that matters. Reply with the summary only.";

const INVALID_FORMAT_OBSERVATION: &str =
    "invalid format, please retry with a single JSON step object";

/// Outcome of one [`ReActEngine::run`] call.
#[derive(Debug)]
pub struct RunOutcome {
    pub answer: String,
    pub trace: Vec<TraceEntry>,
    pub cancelled: bool,
}

pub struct ReActEngine {
    chat: Arc<dyn ChatClient>,
    registry: ToolRegistry,
    max_steps: usize,
    summarise_threshold_chars: usize,
    cancel: CancellationToken,
    invoke_opts: InvokeOptions,
}

impl ReActEngine {
    pub fn new(chat: Arc<dyn ChatClient>, registry: ToolRegistry) -> Self {
        Self {
            chat,
            registry,
            max_steps: DEFAULT_MAX_STEPS,
            summarise_threshold_chars: DEFAULT_SUMMARISE_THRESHOLD_CHARS,
            cancel: CancellationToken::new(),
            invoke_opts: InvokeOptions::default(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_summarise_threshold(mut self, chars: usize) -> Self {
        self.summarise_threshold_chars = chars;
        self
    }

    /// Installs a cancellation token checked before every model call.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_invoke_options(mut self, opts: InvokeOptions) -> Self {
        self.invoke_opts = opts;
        self
    }

    /// Runs the loop until the model finishes, the step budget runs out,
    /// or the run is cancelled. Provider errors are surfaced unretried.
    pub async fn run(&self, input: &str) -> Result<RunOutcome, MnemonError> {
        counter!("mnemon_react_runs_total").increment(1);
        let system = format!("{SYSTEM_TEMPLATE}{}", self.registry.describe_all());
        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(input)];
        let mut trace: Vec<TraceEntry> = Vec::new();

        for step in 1..=self.max_steps {
            if self.cancel.is_cancelled() {
                return Ok(RunOutcome {
                    answer: CANCELLED_MARKER.to_string(),
                    trace,
                    cancelled: true,
                });
            }
            let reply = self.chat.invoke(&messages, &self.invoke_opts).await?;
            messages.push(ChatMessage::assistant(reply.clone()));
            let parsed = parse(&reply);
            counter!("mnemon_react_steps_total").increment(1);

            match parsed.decision {
                StepDecision::Finish(answer) => {
                    debug!(step, "finished");
                    return Ok(RunOutcome {
                        answer,
                        trace,
                        cancelled: false,
                    });
                }
                StepDecision::Act {
                    tool_name,
                    tool_input,
                } => {
                    let input_desc = tool_input.to_string();
                    debug!(step, %tool_name, "dispatching tool");
                    let raw = match self
                        .registry
                        .execute(&tool_name, tool_input.into())
                        .await
                    {
                        Ok(observation) => observation,
                        Err(e) => format!("Error: {e}"),
                    };
                    let summary = if raw.chars().count() > self.summarise_threshold_chars {
                        Some(self.summarise(&tool_name, &input_desc, &raw).await)
                    } else {
                        None
                    };
                    let entry = TraceEntry {
                        step,
                        thought: parsed.thought,
                        tool_name: Some(tool_name),
                        tool_input: Some(input_desc),
                        observation_raw: raw,
                        observation_summary: summary,
                    };
                    messages.push(ChatMessage::user(format!(
                        "Observation: {}",
                        entry.observation_shown()
                    )));
                    trace.push(entry);
                }
                StepDecision::Invalid(raw) => {
                    warn!(step, "unparseable model output");
                    trace.push(TraceEntry {
                        step,
                        thought: parsed.thought,
                        tool_name: None,
                        tool_input: None,
                        observation_raw: raw,
                        observation_summary: Some(INVALID_FORMAT_OBSERVATION.to_string()),
                    });
                    messages.push(ChatMessage::user(format!(
                        "Observation: {INVALID_FORMAT_OBSERVATION}"
                    )));
                }
            }
        }

        // Step budget exhausted: one last call asking for the answer.
        if self.cancel.is_cancelled() {
            return Ok(RunOutcome {
                answer: CANCELLED_MARKER.to_string(),
                trace,
                cancelled: true,
            });
        }
        messages.push(ChatMessage::user(FINALISE_PROMPT));
        let reply = self.chat.invoke(&messages, &self.invoke_opts).await?;
        let answer = match parse(&reply).decision {
            StepDecision::Finish(answer) => answer,
            _ => APOLOGY.to_string(),
        };
        Ok(RunOutcome {
            answer,
            trace,
            cancelled: false,
        })
    }

    /// Condenses an oversized observation through the model. Falls back
    /// to plain truncation when the model call fails.
    async fn summarise(&self, tool_name: &str, tool_input: &str, raw: &str) -> String {
        let messages = [
            ChatMessage::system(SUMMARISE_PROMPT),
            ChatMessage::user(format!(
                "Tool: {tool_name}\nInput: {tool_input}\nOutput:\n{raw}"
            )),
        ];
        match self.chat.invoke(&messages, &self.invoke_opts).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(%tool_name, error = %e, "observation summarisation failed, truncating");
                raw.chars().take(self.summarise_threshold_chars).collect()
            }
        }
    }
}
