//! Query-side retrieval
//!
//! Embeds a query through the same provider used at ingestion, fetches the
//! nearest chunks from the store, and formats them into a citation-tagged
//! context string for the analyzers.

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::store::{ChunkStore, MetadataFilter, RetrievalResult, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Store query failed: {0}")]
    Store(#[from] StoreError),
}

/// Sentinel returned when retrieval finds nothing; analyzers receive this
/// instead of synthetic citations
pub const EMPTY_CONTEXT: &str = "No relevant information found in the document.";

/// Read-path handle over the shared store
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<ChunkStore>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<ChunkStore>) -> Self {
        Self { provider, store }
    }

    /// Retrieve the k most relevant chunks for a query
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>, RetrieveError> {
        self.retrieve_filtered(query, k, None)
    }

    /// Retrieve with an optional metadata filter (e.g. one source document)
    pub fn retrieve_filtered(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>, RetrieveError> {
        let query_embedding = self.provider.embed(query)?;
        let results = self.store.query(&query_embedding, k, filter)?;

        tracing::debug!("Retrieved {} chunks for query", results.len());

        Ok(results)
    }
}

/// Format retrieval results into a context string
///
/// Each result becomes an enumerated block with its citation tag, joined by a
/// visible separator.
pub fn format_context(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}\n{}", i + 1, r.to_citation(), r.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(content: &str, page: i64, source: &str, index: i64) -> RetrievalResult {
        RetrievalResult {
            content: content.to_string(),
            score: 0.1,
            page_number: page,
            source: source.to_string(),
            chunk_index: index,
        }
    }

    #[test]
    fn test_format_context_empty() {
        assert_eq!(format_context(&[]), EMPTY_CONTEXT);
    }

    #[test]
    fn test_format_context_blocks() {
        let results = vec![
            result("Termination requires notice.", 2, "contract.pdf", 0),
            result("Payment is net thirty.", 5, "contract.pdf", 3),
        ];

        let context = format_context(&results);

        assert!(context.starts_with("[1] [contract.pdf, Page 2]\nTermination requires notice."));
        assert!(context.contains("\n\n---\n\n"));
        assert!(context.contains("[2] [contract.pdf, Page 5]\nPayment is net thirty."));
    }

    #[test]
    fn test_format_context_single_block_has_no_separator() {
        let results = vec![result("Only one.", 1, "a.pdf", 0)];
        let context = format_context(&results);
        assert!(!context.contains("---"));
    }
}
