// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic local embedder using feature hashing.
//!
//! Tokenises on non-alphanumerics, hashes each lowercased token (and its
//! bigrams) into a fixed-size bucket vector with a sign bit, then
//! L2-normalises. No network, no model weights, stable across runs.
//! Similar texts share tokens and therefore land close in cosine space,
//! which is enough for tests and offline runs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use mnemon_core::MnemonError;
use mnemon_core::traits::Embedder;

/// Feature-hashing embedder with a fixed dimensionality.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Default dimensionality used when config does not override it.
    pub const DEFAULT_DIMENSIONS: usize = 384;

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect();

        for token in &tokens {
            self.bump(&mut vector, token);
        }
        for pair in tokens.windows(2) {
            self.bump(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn bump(&self, vector: &mut [f32], feature: &str) {
        let digest = Sha256::digest(feature.as_bytes());
        let bucket =
            u64::from_le_bytes(digest[0..8].try_into().unwrap()) as usize % self.dimensions;
        // One digest byte decides the sign so collisions partially cancel.
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MnemonError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
