// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedder trait for text-to-vector conversion.

use async_trait::async_trait;

use crate::error::MnemonError;

/// Batched, deterministic text-to-vector function.
///
/// Deterministic for identical inputs within one process lifetime.
/// Failures surface as errors; there is no silent zero-vector fallback.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds the given texts in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemonError>;

    /// Fixed output dimensionality of this embedder.
    fn dimensions(&self) -> usize;
}
