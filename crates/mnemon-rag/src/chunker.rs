// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Markdown-aware chunker.
//!
//! Splits normalised Markdown into token-bounded chunks. Splits prefer
//! heading boundaries, then paragraphs, then sentences, then raw tokens.
//! Fenced code blocks are never split; a fence larger than the chunk
//! size becomes a single oversized chunk rather than being broken.

use uuid::Uuid;

use mnemon_core::tokens::count_tokens;
use mnemon_core::types::DocumentChunk;

#[derive(Debug)]
enum Block {
    Heading { level: usize, text: String },
    Fence(String),
    Paragraph(String),
}

/// Markdown chunker with fixed token targets.
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(16),
            overlap,
        }
    }

    /// Chunks a normalised Markdown body into ordered, token-bounded spans.
    pub fn chunk(
        &self,
        document_id: &str,
        namespace: &str,
        markdown: &str,
    ) -> Vec<DocumentChunk> {
        let blocks = parse_blocks(markdown);
        let mut chunks: Vec<DocumentChunk> = Vec::new();

        let mut stack: Vec<String> = Vec::new();
        let mut cur_blocks: Vec<String> = Vec::new();
        let mut cur_tokens = 0usize;
        let mut cur_path: Vec<String> = Vec::new();
        let mut pending_overlap = String::new();

        let mut flush =
            |cur_blocks: &mut Vec<String>, cur_tokens: &mut usize, cur_path: &mut Vec<String>| {
                if cur_blocks.is_empty() {
                    return None;
                }
                let text = cur_blocks.join("\n\n");
                let overlap_tail = if self.overlap > 0 {
                    overlap_tail(&text, self.overlap)
                } else {
                    String::new()
                };
                chunks.push(DocumentChunk {
                    chunk_id: Uuid::new_v4().to_string(),
                    document_id: document_id.to_string(),
                    namespace: namespace.to_string(),
                    ordinal: chunks.len(),
                    token_count: count_tokens(&text),
                    text,
                    heading_path: cur_path.clone(),
                    embedding: None,
                });
                cur_blocks.clear();
                *cur_tokens = 0;
                cur_path.clear();
                Some(overlap_tail)
            };

        for block in blocks {
            let (text, is_heading) = match &block {
                Block::Heading { text, .. } => (text.clone(), true),
                Block::Fence(text) => (text.clone(), false),
                Block::Paragraph(text) => (text.clone(), false),
            };

            // A heading starts a fresh chunk when the current one already
            // has content, so sections stay aligned to heading boundaries.
            if is_heading && !cur_blocks.is_empty() {
                if let Some(tail) = flush(&mut cur_blocks, &mut cur_tokens, &mut cur_path) {
                    pending_overlap = tail;
                }
            }

            // Oversized paragraphs split against the budget minus overlap,
            // leaving room for the carried tail.
            let effective = self.chunk_size.saturating_sub(self.overlap).max(8);
            let pieces: Vec<String> = match &block {
                Block::Paragraph(text) if count_tokens(text) > effective => {
                    split_oversized(text, effective)
                }
                _ => vec![text],
            };

            for piece in pieces {
                let piece_tokens = count_tokens(&piece);
                if !cur_blocks.is_empty() && cur_tokens + piece_tokens > self.chunk_size {
                    if let Some(tail) = flush(&mut cur_blocks, &mut cur_tokens, &mut cur_path) {
                        pending_overlap = tail;
                    }
                }
                if cur_blocks.is_empty() {
                    cur_path = stack.clone();
                    if is_heading {
                        // The heading opening the chunk belongs to its path.
                        let (level, title) = heading_parts(&piece);
                        let mut path = stack.clone();
                        path.truncate(level.saturating_sub(1));
                        path.push(title);
                        cur_path = path;
                    }
                    if !pending_overlap.is_empty() && !is_heading {
                        cur_tokens += count_tokens(&pending_overlap);
                        cur_blocks.push(std::mem::take(&mut pending_overlap));
                    }
                    pending_overlap.clear();
                }
                cur_tokens += piece_tokens;
                cur_blocks.push(piece);
            }

            if let Block::Heading { level, text } = &block {
                let (_, title) = heading_parts(text);
                stack.truncate(level.saturating_sub(1));
                stack.push(title);
            }
        }
        flush(&mut cur_blocks, &mut cur_tokens, &mut cur_path);
        chunks
    }
}

fn heading_parts(line: &str) -> (usize, String) {
    let level = line.chars().take_while(|&c| c == '#').count();
    (level, line.trim_start_matches('#').trim().to_string())
}

/// Parses Markdown into heading, fence, and paragraph blocks.
fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut fence: Option<Vec<&str>> = None;

    for line in markdown.lines() {
        if let Some(lines) = fence.as_mut() {
            lines.push(line);
            if line.trim_start().starts_with("```") {
                blocks.push(Block::Fence(fence.take().unwrap().join("\n")));
            }
            continue;
        }
        if line.trim_start().starts_with("```") {
            if !paragraph.is_empty() {
                blocks.push(Block::Paragraph(paragraph.join("\n")));
                paragraph.clear();
            }
            fence = Some(vec![line]);
            continue;
        }
        let hashes = line.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
            if !paragraph.is_empty() {
                blocks.push(Block::Paragraph(paragraph.join("\n")));
                paragraph.clear();
            }
            blocks.push(Block::Heading {
                level: hashes,
                text: line.trim_end().to_string(),
            });
            continue;
        }
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                blocks.push(Block::Paragraph(paragraph.join("\n")));
                paragraph.clear();
            }
            continue;
        }
        paragraph.push(line);
    }
    if let Some(lines) = fence {
        // Unterminated fence: keep what we have.
        blocks.push(Block::Fence(lines.join("\n")));
    }
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(paragraph.join("\n")));
    }
    blocks
}

/// Extracts the plain-text tail of a chunk for overlap, stripping
/// heading lines and fenced code.
fn overlap_tail(text: &str, overlap_tokens: usize) -> String {
    let mut in_fence = false;
    let mut plain: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let hashes = line.chars().take_while(|&c| c == '#').count();
        if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
            continue;
        }
        plain.push(line);
    }
    let joined = plain.join(" ");
    let words: Vec<&str> = joined.split_whitespace().collect();
    let start = words.len().saturating_sub(overlap_tokens);
    words[start..].join(" ")
}

/// Splits an oversized paragraph at sentence boundaries, falling back to
/// whitespace tokens for any single sentence that is still too large.
fn split_oversized(text: &str, chunk_size: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    let mut push_current = |current: &mut String, pieces: &mut Vec<String>| {
        if !current.trim().is_empty() {
            pieces.push(current.trim().to_string());
        }
        current.clear();
    };

    for sentence in sentences {
        if count_tokens(&sentence) > chunk_size {
            push_current(&mut current, &mut pieces);
            pieces.extend(split_by_words(&sentence, chunk_size));
            continue;
        }
        let candidate = if current.is_empty() {
            sentence.clone()
        } else {
            format!("{current} {sentence}")
        };
        if count_tokens(&candidate) > chunk_size {
            push_current(&mut current, &mut pieces);
            current = sentence;
        } else {
            current = candidate;
        }
    }
    push_current(&mut current, &mut pieces);
    pieces
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | '\u{3002}' | '\u{ff01}' | '\u{ff1f}') {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

fn split_by_words(text: &str, chunk_size: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if count_tokens(&candidate) > chunk_size && !current.is_empty() {
            pieces.push(current);
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
