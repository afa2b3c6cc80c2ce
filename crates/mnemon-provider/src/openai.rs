// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible `/v1/chat/completions` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use mnemon_config::LlmConfig;
use mnemon_core::MnemonError;
use mnemon_core::traits::ChatClient;
use mnemon_core::types::{ChatMessage, InvokeOptions};

/// HTTP chat client talking to any OpenAI-compatible completions
/// endpoint. One retry after a short pause on 429/500/503; everything
/// else surfaces immediately.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

const RETRY_PAUSE: Duration = Duration::from_secs(1);

impl OpenAiChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: chat_endpoint(&base_url.into()),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2_048,
            timeout: Duration::from_secs(60),
        }
    }

    /// Builds a client from the loaded configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self, MnemonError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| MnemonError::Config("llm.api_key is not set".into()))?;
        let mut client = Self::new(&config.base_url, api_key, &config.model);
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        client.timeout = Duration::from_secs(config.timeout_secs);
        Ok(client)
    }

    async fn send_once(&self, body: &serde_json::Value, timeout: Duration) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await
    }
}

/// Resolves the full chat completions URL from a configured base URL.
fn chat_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        return trimmed.to_string();
    }
    let last = trimmed.rsplit('/').next().unwrap_or_default();
    let is_versioned = last.len() >= 2
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    if is_versioned {
        format!("{trimmed}/chat/completions")
    } else {
        format!("{trimmed}/v1/chat/completions")
    }
}

#[derive(Deserialize)]
struct CompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        opts: &InvokeOptions,
    ) -> Result<String, MnemonError> {
        let temperature = opts
            .temperature
            .unwrap_or(self.temperature)
            .clamp(0.0, 2.0);
        let max_tokens = opts.max_tokens.unwrap_or(self.max_tokens);
        let timeout = opts.timeout.unwrap_or(self.timeout);

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        debug!(model = %self.model, messages = messages.len(), "chat request");

        let mut response = self
            .send_once(&body, timeout)
            .await
            .map_err(|e| MnemonError::Provider {
                message: format!("chat request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if matches!(response.status().as_u16(), 429 | 500 | 503) {
            warn!(status = %response.status(), "retrying chat request once");
            tokio::time::sleep(RETRY_PAUSE).await;
            response = self
                .send_once(&body, timeout)
                .await
                .map_err(|e| MnemonError::Provider {
                    message: format!("chat retry failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MnemonError::provider(format!(
                "chat endpoint returned {status}: {body}"
            )));
        }

        let parsed: CompletionsResponse =
            response.json().await.map_err(|e| MnemonError::Provider {
                message: format!("malformed chat response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MnemonError::provider("chat response carried no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "content": text } } ] })
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:8080/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn invokes_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-test" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("hello back")))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "key", "gpt-test");
        let out = client
            .invoke(&[ChatMessage::user("hello")], &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "hello back");
    }

    #[tokio::test]
    async fn temperature_is_clamped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "temperature": 2.0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "key", "m");
        let opts = InvokeOptions {
            temperature: Some(9.5),
            ..InvokeOptions::default()
        };
        let out = client
            .invoke(&[ChatMessage::user("x")], &opts)
            .await
            .unwrap();
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn retries_once_on_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("after retry")))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "key", "m");
        let out = client
            .invoke(&[ChatMessage::user("x")], &InvokeOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "after retry");
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "wrong", "m");
        let err = client
            .invoke(&[ChatMessage::user("x")], &InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            OpenAiChatClient::from_config(&config),
            Err(MnemonError::Config(_))
        ));
    }
}
