//! Boundary-aware text chunking
//!
//! Splits page text into overlapping segments sized for embedding. Cuts
//! prefer a paragraph break, then a sentence break, found in the last 20% of
//! the window; otherwise the cut lands at the exact size offset.

use crate::error::{DoclensError, Result};
use serde::Serialize;

/// Validated chunking parameters
///
/// `overlap` must stay below half of `chunk_size`: a boundary cut can pull a
/// window back to 80% of its nominal size, and the cursor must still advance
/// after subtracting the overlap.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DoclensError::InvalidConfigValue {
                path: "chunking.chunk_size".to_string(),
                message: "chunk size must be greater than 0".to_string(),
            });
        }
        if overlap >= chunk_size / 2 {
            return Err(DoclensError::InvalidConfigValue {
                path: "chunking.overlap".to_string(),
                message: format!(
                    "overlap ({}) must be less than half the chunk size ({})",
                    overlap, chunk_size
                ),
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// A chunk of text with source metadata for citations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    pub content: String,
    /// Global position across all pages of one ingestion run
    pub chunk_index: usize,
    pub page_number: usize,
    pub source: String,
}

/// Split text into overlapping segments
///
/// Segments are trimmed; empty-after-trim segments are dropped. The final
/// segment ends exactly at the text end.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunk_size = config.chunk_size;
    let overlap = config.overlap;

    if text.len() <= chunk_size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let len = text.len();

    while start < len {
        let mut end = floor_char_boundary(text, (start + chunk_size).min(len));
        if end <= start {
            // A single char wider than the window; take it whole
            end = next_char_boundary(text, start + 1);
        }

        if end < len {
            // Look for a paragraph break in the last 20% of the window,
            // falling back to a sentence break
            let search_start =
                floor_char_boundary(text, end.saturating_sub(chunk_size / 5).max(start));
            let window = &text[search_start..end];

            if let Some(pos) = window.rfind("\n\n") {
                end = search_start + pos + 2;
            } else if let Some(pos) = window.rfind(". ") {
                end = search_start + pos + 2;
            }
        }

        let segment = text[start..end].trim();
        if !segment.is_empty() {
            chunks.push(segment.to_string());
        }

        start = if end < len {
            // Step back by the overlap, but always advance past the
            // previous window start
            let next = floor_char_boundary(text, end.saturating_sub(overlap));
            if next > start {
                next
            } else {
                end
            }
        } else {
            len
        };
    }

    chunks
}

/// Chunk a sequence of pages into TextChunks with one globally increasing
/// index, preserving page order and in-page order
pub fn chunk_documents(pages: &[super::DocumentPage], config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut all_chunks = Vec::new();
    let mut global_index = 0usize;

    for page in pages {
        for content in chunk_text(&page.content, config) {
            all_chunks.push(TextChunk {
                content,
                chunk_index: global_index,
                page_number: page.page_number,
                source: page.source.clone(),
            });
            global_index += 1;
        }
    }

    all_chunks
}

/// Largest char boundary at or below `index`
fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary at or above `index`
fn next_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}
