// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemon agent core.

use thiserror::Error;

/// The primary error type used across all Mnemon adapter traits and core operations.
///
/// Tool and parse failures are recovered locally inside the ReAct loop;
/// every other kind propagates to the caller.
#[derive(Debug, Error)]
pub enum MnemonError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM or embedding provider errors (HTTP failure, auth, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A tool raised an error or refused its input.
    #[error("tool error: {0}")]
    Tool(String),

    /// Model output could not be parsed into a step decision.
    #[error("parse error: {0}")]
    Parse(String),

    /// An id lookup found nothing.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The ingestor cannot normalise the given input format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Mandatory prompt sections alone exceed the context token budget.
    #[error("context budget exceeded: mandatory sections need {needed} tokens, budget is {max}")]
    BudgetExceeded { needed: usize, max: usize },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemonError {
    /// Wraps an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MnemonError::Storage {
            source: Box::new(source),
        }
    }

    /// Builds a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        MnemonError::Provider {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = MnemonError::Config("missing llm.model".into());
        assert_eq!(err.to_string(), "configuration error: missing llm.model");

        let err = MnemonError::NotFound {
            kind: "document",
            id: "doc-1".into(),
        };
        assert_eq!(err.to_string(), "document not found: doc-1");

        let err = MnemonError::BudgetExceeded {
            needed: 1200,
            max: 1000,
        };
        assert!(err.to_string().contains("1200"));
        assert!(err.to_string().contains("1000"));
    }

    #[test]
    fn provider_helper_has_no_source() {
        let err = MnemonError::provider("timeout talking to api");
        match err {
            MnemonError::Provider { message, source } => {
                assert_eq!(message, "timeout talking to api");
                assert!(source.is_none());
            }
            _ => panic!("expected Provider variant"),
        }
    }
}
