//! Integration tests for the write path: load, chunk, embed, store

mod common;

use common::HashEmbedding;
use doclens::embedding::EmbeddingProvider;
use doclens::ingest::{ingest_document, ChunkingConfig};
use doclens::retrieval::Retriever;
use doclens::store::{ChunkStore, MetadataFilter, StoreConfig};
use std::sync::Arc;
use tempfile::TempDir;

const DIMENSION: usize = 16;

fn test_store(temp: &TempDir) -> Arc<ChunkStore> {
    let config = StoreConfig {
        dimension: DIMENSION,
        ..StoreConfig::default()
    };
    Arc::new(ChunkStore::open(&temp.path().join("store.db"), config).unwrap())
}

/// A document whose content is exactly chunk_size characters yields exactly
/// one chunk with index 0 on page 1, retrievable by its own content
#[test]
fn test_single_chunk_document_roundtrip() {
    let temp = TempDir::new().unwrap();
    let chunking = ChunkingConfig::new(500, 50).unwrap();

    let base = "The party of the first part agrees to the stated terms and conditions. ";
    let mut content = base.repeat(8);
    content.truncate(500);
    assert_eq!(content.len(), 500);
    assert_eq!(content, content.trim());

    let doc_path = temp.path().join("contract.txt");
    std::fs::write(&doc_path, &content).unwrap();

    let provider = HashEmbedding::new(DIMENSION);
    let store = test_store(&temp);

    let report = ingest_document(&doc_path, &chunking, &provider, &store).unwrap();
    assert_eq!(report.pages, 1);
    assert_eq!(report.chunks, 1);
    assert_eq!(report.total_indexed, 1);

    // Query with the chunk's own content: exact vector, score ~0
    let query_embedding = provider.embed(&content).unwrap();
    let results = store.query(&query_embedding, 1, None).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk_index, 0);
    assert_eq!(results[0].page_number, 1);
    assert_eq!(results[0].source, "contract.txt");
    assert!(results[0].score < 1e-3);
}

#[test]
fn test_multi_chunk_document_indexed_in_order() {
    let temp = TempDir::new().unwrap();
    let chunking = ChunkingConfig::new(200, 20).unwrap();

    let content = "The vendor shall deliver the goods on schedule. \
                   The customer shall pay invoices within thirty days. "
        .repeat(10);
    let doc_path = temp.path().join("terms.txt");
    std::fs::write(&doc_path, &content).unwrap();

    let provider = HashEmbedding::new(DIMENSION);
    let store = test_store(&temp);

    let report = ingest_document(&doc_path, &chunking, &provider, &store).unwrap();
    assert!(report.chunks > 1);
    assert_eq!(report.total_indexed, report.chunks);
    assert_eq!(store.count().unwrap(), report.chunks);
}

#[test]
fn test_retriever_filtered_by_source() {
    let temp = TempDir::new().unwrap();
    let chunking = ChunkingConfig::new(500, 50).unwrap();
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedding::new(DIMENSION));
    let store = test_store(&temp);

    let contract = temp.path().join("contract.txt");
    std::fs::write(&contract, "Termination requires ninety days notice.").unwrap();
    let lease = temp.path().join("lease.txt");
    std::fs::write(&lease, "The lease renews on the first of January.").unwrap();

    ingest_document(&contract, &chunking, provider.as_ref(), &store).unwrap();
    let report = ingest_document(&lease, &chunking, provider.as_ref(), &store).unwrap();
    assert_eq!(report.total_indexed, 2);

    let retriever = Retriever::new(provider.clone(), store.clone());

    let filter = MetadataFilter::by_source("lease.txt");
    let results = retriever
        .retrieve_filtered("renewal date", 5, Some(&filter))
        .unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.source, "lease.txt");
    }
    // The second run's indices were shifted past the first document's
    assert_eq!(results[0].chunk_index, 1);
}

#[test]
fn test_unsupported_and_missing_documents() {
    let temp = TempDir::new().unwrap();
    let chunking = ChunkingConfig::new(500, 50).unwrap();
    let provider = HashEmbedding::new(DIMENSION);
    let store = test_store(&temp);

    let missing = temp.path().join("ghost.pdf");
    let result = ingest_document(&missing, &chunking, &provider, &store);
    assert!(matches!(
        result,
        Err(doclens::DoclensError::DocumentNotFound { .. })
    ));

    let odd = temp.path().join("data.xlsx");
    std::fs::write(&odd, "not a spreadsheet").unwrap();
    let result = ingest_document(&odd, &chunking, &provider, &store);
    assert!(matches!(
        result,
        Err(doclens::DoclensError::UnsupportedFileType { .. })
    ));

    // Neither failure touched the store
    assert_eq!(store.count().unwrap(), 0);
}
