// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider clients. Providers are swapped via configuration; all
//! of them satisfy the same `ChatClient` contract.

pub mod openai;

pub use openai::OpenAiChatClient;
