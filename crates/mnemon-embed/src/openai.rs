// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible `/v1/embeddings` client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::traits::Embedder;

/// HTTP embedder talking to any OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: embeddings_endpoint(&base_url.into()),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }
}

/// Resolves the full embeddings URL from a configured base URL.
///
/// Accepts a bare host (`https://api.openai.com`), a versioned base
/// (`.../v1`), or an explicit endpoint already ending in `/embeddings`.
fn embeddings_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/embeddings") {
        return trimmed.to_string();
    }
    let last = trimmed.rsplit('/').next().unwrap_or_default();
    // Any version suffix (v1, v2, ...) is treated as the API root.
    let is_versioned = last.len() >= 2
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    if is_versioned {
        format!("{trimmed}/embeddings")
    } else {
        format!("{trimmed}/v1/embeddings")
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemonError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| MnemonError::Provider {
                message: format!("embeddings request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MnemonError::provider(format!(
                "embeddings endpoint returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| MnemonError::Provider {
                message: format!("malformed embeddings response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if parsed.data.len() != texts.len() {
            return Err(MnemonError::provider(format!(
                "embeddings count mismatch: sent {}, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API may reorder; restore input order via the index field.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
