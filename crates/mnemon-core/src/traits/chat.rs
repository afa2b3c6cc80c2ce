// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat client trait for LLM provider integrations.

use async_trait::async_trait;

use crate::error::MnemonError;
use crate::types::{ChatMessage, InvokeOptions};

/// Abstract LLM invocation: messages in, text out.
///
/// No tool-calling protocol is required; tool use is driven by the ReAct
/// engine via text parsing. Providers may differ in determinism but must
/// not change the contract shape.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the messages and returns the assistant's text reply.
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        opts: &InvokeOptions,
    ) -> Result<String, MnemonError>;
}
