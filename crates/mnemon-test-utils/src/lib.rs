// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles: a scripted chat client returning canned replies
//! in FIFO order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mnemon_core::MnemonError;
use mnemon_core::traits::ChatClient;
use mnemon_core::types::{ChatMessage, InvokeOptions};

/// Chat client that replays a fixed script of responses.
///
/// Each `invoke` pops the next scripted reply; running out of script is
/// a provider error so tests fail loudly on unexpected extra calls.
#[derive(Clone, Default)]
pub struct MockChatClient {
    responses: Arc<Mutex<VecDeque<String>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockChatClient {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(Into::into).collect(),
            )),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Appends another scripted response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push_back(response.into());
    }

    /// Number of invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The messages of the n-th invocation (0-based).
    pub fn call_messages(&self, n: usize) -> Option<Vec<ChatMessage>> {
        self.calls.lock().unwrap().get(n).cloned()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        _opts: &InvokeOptions,
    ) -> Result<String, MnemonError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MnemonError::provider("mock chat client script exhausted"))
    }
}
