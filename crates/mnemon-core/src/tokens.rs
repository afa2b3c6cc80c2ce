// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token counting via the cl100k_base BPE, shared by the chunker and
//! the context builder so budgets agree across components.

use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;

static BPE: LazyLock<Option<CoreBPE>> = LazyLock::new(|| tiktoken_rs::cl100k_base().ok());

/// Counts tokens in `text` with cl100k_base, falling back to a 4-chars-per-token
/// estimate if the encoder failed to initialise.
pub fn count_tokens(text: &str) -> usize {
    match BPE.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.len().div_ceil(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(count_tokens(""), 0);
    }

    #[test]
    fn longer_text_has_more_tokens() {
        let short = count_tokens("hello");
        let long = count_tokens("hello world, this is a longer sentence about token counting");
        assert!(long > short);
    }

    #[test]
    fn deterministic_within_process() {
        let text = "the same input must always count the same";
        assert_eq!(count_tokens(text), count_tokens(text));
    }
}
