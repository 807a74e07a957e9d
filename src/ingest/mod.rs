//! Document ingestion: load, chunk, embed, store
//!
//! The write path of the pipeline. Pages from the loader are split into
//! overlapping chunks, embedded as one batch, and persisted in the chunk
//! store where the read path can retrieve them.

mod chunker;
mod loader;

pub use chunker::{chunk_documents, chunk_text, ChunkingConfig, TextChunk};
pub use loader::{load_document, DocumentPage};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::store::ChunkStore;
use serde::Serialize;
use std::path::Path;

/// Summary of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Pages produced by the loader
    pub pages: usize,
    /// Chunks created from this document
    pub chunks: usize,
    /// Total chunks in the store after ingestion
    pub total_indexed: usize,
}

/// Ingest one document into the store
pub fn ingest_document(
    path: &Path,
    config: &ChunkingConfig,
    provider: &dyn EmbeddingProvider,
    store: &ChunkStore,
) -> Result<IngestReport> {
    let pages = load_document(path)?;
    tracing::info!("Loaded {} pages from {}", pages.len(), path.display());

    let mut chunks = chunk_documents(&pages, config);

    // Chunk indices restart at 0 for every run; shift them past existing
    // chunks so documents never collide in the store
    let base_index = store.next_chunk_index()?;
    if base_index > 0 {
        for chunk in &mut chunks {
            chunk.chunk_index += base_index;
        }
    }

    if chunks.is_empty() {
        tracing::warn!("No chunks produced from {}", path.display());
        return Ok(IngestReport {
            pages: pages.len(),
            chunks: 0,
            total_indexed: store.count()?,
        });
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = provider.embed_batch(&texts)?;

    store.add_documents(&chunks, &embeddings)?;

    let report = IngestReport {
        pages: pages.len(),
        chunks: chunks.len(),
        total_indexed: store.count()?,
    };

    tracing::info!(
        "Ingested {}: {} chunks from {} pages ({} total in store)",
        path.display(),
        report.chunks,
        report.pages,
        report.total_indexed
    );

    Ok(report)
}
