//! Chunk store: SQLite-backed metadata with an HNSW vector index
//!
//! The write path persists chunk content, metadata, and embeddings in SQLite;
//! the read path answers nearest-neighbor queries from an in-memory HNSW
//! index rebuilt from the persisted embeddings on open. Both paths share one
//! store handle, which is internally locked and safe to share across tasks.

mod vector_index;

pub use vector_index::{NearestNeighbor, VectorIndex, VectorIndexError};

use crate::ingest::TextChunk;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Chunk/embedding length mismatch: {chunks} chunks, {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Vector index error: {0}")]
    Index(#[from] VectorIndexError),

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },
}

/// A single retrieval match with content and citation metadata
///
/// Produced transiently by a query; ordering is ascending by score
/// (lower cosine distance = more similar).
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub content: String,
    /// Cosine distance; 0.0 for an identical vector
    pub score: f32,
    pub page_number: i64,
    pub source: String,
    pub chunk_index: i64,
}

impl RetrievalResult {
    /// Human-readable source tag, e.g. `[contract.pdf, Page 3]`
    pub fn to_citation(&self) -> String {
        format!("[{}, Page {}]", self.source, self.page_number)
    }
}

/// Metadata equality filter applied after the nearest-neighbor search
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub source: Option<String>,
    pub page_number: Option<i64>,
}

impl MetadataFilter {
    pub fn by_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            page_number: None,
        }
    }

    fn matches(&self, source: &str, page_number: i64) -> bool {
        if let Some(wanted) = &self.source {
            if wanted != source {
                return false;
            }
        }
        if let Some(wanted) = self.page_number {
            if wanted != page_number {
                return false;
            }
        }
        true
    }
}

/// Store tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Vector dimension (must match the embedding provider)
    pub dimension: usize,
    /// HNSW construction parameter (higher = better recall, slower build)
    pub hnsw_ef_construction: usize,
    /// HNSW M parameter (number of connections per layer)
    pub hnsw_m: usize,
    /// HNSW search parameter (higher = better recall, slower search)
    pub hnsw_ef_search: usize,
    /// Over-fetch factor for filtered queries, so a metadata filter can still
    /// fill k results
    pub search_multiplier: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            hnsw_ef_construction: 200,
            hnsw_m: 16,
            hnsw_ef_search: 100,
            search_multiplier: 4,
        }
    }
}

/// Connection pool type
pub type DbPool = Pool<SqliteConnectionManager>;

/// Persistent chunk store shared by the write (ingestion) and read (query)
/// paths
pub struct ChunkStore {
    pool: DbPool,
    index: VectorIndex,
    config: StoreConfig,
}

impl ChunkStore {
    /// Open (or create) a store at the given database path
    ///
    /// Rebuilds the in-memory vector index from the persisted embeddings, so
    /// a store ingested in a previous process is immediately queryable.
    pub fn open(db_path: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                source: e,
                context: format!("Failed to create store directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(16)
            .build(manager)
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        {
            let conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
        }

        let index = VectorIndex::new(config.dimension, config.hnsw_ef_construction, config.hnsw_m);

        let store = Self {
            pool,
            index,
            config,
        };

        store.migrate()?;
        store.rebuild_index()?;

        Ok(store)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Pool(e.to_string()))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying store migration {}", version);
                conn.execute_batch(migration)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Load all persisted embeddings into the vector index
    fn rebuild_index(&self) -> Result<(), StoreError> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT chunk_index, vector FROM embeddings")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((id, blob))
        })?;

        let mut loaded = 0u64;
        for row in rows {
            let (id, blob) = row?;
            let vector = blob_to_vector(&blob);
            self.index.insert(id as u64, &vector)?;
            loaded += 1;
        }

        if loaded > 0 {
            tracing::debug!("Rebuilt vector index with {} embeddings", loaded);
        }

        Ok(())
    }

    /// Add chunks and their embeddings as one batch
    ///
    /// The SQLite writes happen in a single transaction, so a failed batch is
    /// not observable by subsequent queries. Each chunk is keyed by its
    /// `chunk_index`; re-adding an existing index replaces the stored row,
    /// though the in-memory index keeps the older vector until the store is
    /// reopened — `clear` before re-ingesting a document.
    pub fn add_documents(
        &self,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if chunks.len() != embeddings.len() {
            return Err(StoreError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        // Validate dimensions up front so the transaction never partially
        // represents the batch
        for embedding in embeddings {
            if embedding.len() != self.config.dimension {
                return Err(StoreError::Index(VectorIndexError::InvalidDimension {
                    expected: self.config.dimension,
                    actual: embedding.len(),
                }));
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            tx.execute(
                "INSERT OR REPLACE INTO chunks (chunk_index, content, page_number, source)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    chunk.chunk_index as i64,
                    &chunk.content,
                    chunk.page_number as i64,
                    &chunk.source,
                ],
            )?;

            tx.execute(
                "INSERT OR REPLACE INTO embeddings (chunk_index, vector)
                 VALUES (?1, ?2)",
                params![chunk.chunk_index as i64, vector_to_blob(embedding)],
            )?;
        }

        tx.commit()?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.index.insert(chunk.chunk_index as u64, embedding)?;
        }

        tracing::debug!("Stored {} chunks", chunks.len());

        Ok(())
    }

    /// Nearest-neighbor query under cosine distance
    ///
    /// Returns at most `k` results ordered by ascending score. An empty store
    /// or a filter that matches nothing yields an empty Vec, never an error.
    pub fn query(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<RetrievalResult>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch when filtering so post-filter truncation can still
        // return k results
        let fetch = if filter.is_some() {
            k * self.config.search_multiplier.max(1)
        } else {
            k
        };

        let neighbors = self
            .index
            .search(query_embedding, fetch, self.config.hnsw_ef_search)?;

        if neighbors.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT content, page_number, source FROM chunks WHERE chunk_index = ?1")?;

        let mut results = Vec::with_capacity(neighbors.len().min(k));
        for neighbor in neighbors {
            let row = stmt
                .query_row(params![neighbor.id as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;

            let Some((content, page_number, source)) = row else {
                tracing::warn!("Chunk {} present in index but not in store", neighbor.id);
                continue;
            };

            if let Some(filter) = filter {
                if !filter.matches(&source, page_number) {
                    continue;
                }
            }

            results.push(RetrievalResult {
                content,
                score: neighbor.distance,
                page_number,
                source,
                chunk_index: neighbor.id as i64,
            });

            if results.len() == k {
                break;
            }
        }

        Ok(results)
    }

    /// First chunk index not yet in use
    ///
    /// Ingestion offsets each run's indices by this value so chunks from
    /// different documents never collide.
    pub fn next_chunk_index(&self) -> Result<usize, StoreError> {
        let conn = self.get_conn()?;
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(chunk_index) + 1, 0) FROM chunks",
            [],
            |row| row.get(0),
        )?;
        Ok(next as usize)
    }

    /// Number of stored chunks
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Remove everything, leaving the store queryable and empty
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM embeddings", [])?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.commit()?;

        self.index.clear();

        tracing::info!("Chunk store cleared");

        Ok(())
    }

    /// Vector dimension this store was opened with
    pub fn dimension(&self) -> usize {
        self.config.dimension
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

/// Store migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Chunks table (content + citation metadata)
    CREATE TABLE chunks (
        chunk_index INTEGER PRIMARY KEY,
        content TEXT NOT NULL,
        page_number INTEGER NOT NULL,
        source TEXT NOT NULL
    );

    CREATE INDEX idx_chunks_source ON chunks(source);

    -- Embeddings table (vectors as little-endian f32 blobs)
    CREATE TABLE embeddings (
        chunk_index INTEGER PRIMARY KEY,
        vector BLOB NOT NULL,
        FOREIGN KEY (chunk_index) REFERENCES chunks(chunk_index) ON DELETE CASCADE
    );
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> StoreConfig {
        StoreConfig {
            dimension: 8,
            ..StoreConfig::default()
        }
    }

    fn make_chunk(index: usize, content: &str, page: usize, source: &str) -> TextChunk {
        TextChunk {
            content: content.to_string(),
            chunk_index: index,
            page_number: page,
            source: source.to_string(),
        }
    }

    fn axis_vec(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; 8];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_roundtrip_exact_match() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let chunks = vec![
            make_chunk(0, "Termination clause text.", 1, "contract.pdf"),
            make_chunk(1, "Payment schedule text.", 2, "contract.pdf"),
        ];
        let embeddings = vec![axis_vec(0), axis_vec(1)];

        store.add_documents(&chunks, &embeddings).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let results = store.query(&axis_vec(0), 1, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_index, 0);
        assert_eq!(results[0].content, "Termination clause text.");
        assert_eq!(results[0].page_number, 1);
        assert!(results[0].score < 1e-3);
    }

    #[test]
    fn test_results_ordered_by_ascending_score() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let mut near = axis_vec(0);
        near[1] = 0.4;

        let chunks = vec![
            make_chunk(0, "exact", 1, "a.pdf"),
            make_chunk(1, "near", 1, "a.pdf"),
            make_chunk(2, "far", 1, "a.pdf"),
        ];
        store
            .add_documents(&chunks, &[axis_vec(0), near, axis_vec(7)])
            .unwrap();

        let results = store.query(&axis_vec(0), 3, None).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk_index, 0);
        assert!(results[0].score <= results[1].score);
        assert!(results[1].score <= results[2].score);
    }

    #[test]
    fn test_source_filter() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let chunks = vec![
            make_chunk(0, "from contract", 1, "contract.pdf"),
            make_chunk(1, "from lease", 1, "lease.pdf"),
        ];
        store
            .add_documents(&chunks, &[axis_vec(0), axis_vec(1)])
            .unwrap();

        let filter = MetadataFilter::by_source("lease.pdf");
        let results = store.query(&axis_vec(0), 2, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "lease.pdf");

        let filter = MetadataFilter::by_source("missing.pdf");
        let results = store.query(&axis_vec(0), 2, Some(&filter)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_store_query() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let results = store.query(&axis_vec(0), 5, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let chunks = vec![make_chunk(0, "one", 1, "a.pdf")];
        let result = store.add_documents(&chunks, &[]);
        assert!(matches!(result, Err(StoreError::LengthMismatch { .. })));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let chunks = vec![make_chunk(0, "one", 1, "a.pdf")];
        let result = store.add_documents(&chunks, &[vec![1.0; 3]]);
        assert!(result.is_err());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_clear_leaves_store_usable() {
        let temp = TempDir::new().unwrap();
        let store = ChunkStore::open(&temp.path().join("store.db"), test_config()).unwrap();

        let chunks = vec![make_chunk(0, "text", 1, "a.pdf")];
        store.add_documents(&chunks, &[axis_vec(0)]).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.query(&axis_vec(0), 1, None).unwrap().is_empty());

        // Re-creatable collection: inserts still work after clear
        store.add_documents(&chunks, &[axis_vec(0)]).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let results = store.query(&axis_vec(0), 1, None).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_index_rebuilt_on_reopen() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("store.db");

        {
            let store = ChunkStore::open(&db_path, test_config()).unwrap();
            let chunks = vec![make_chunk(0, "persisted chunk", 3, "contract.pdf")];
            store.add_documents(&chunks, &[axis_vec(2)]).unwrap();
        }

        let store = ChunkStore::open(&db_path, test_config()).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        let results = store.query(&axis_vec(2), 1, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_index, 0);
        assert_eq!(results[0].page_number, 3);
        assert!(results[0].score < 1e-3);
    }

    #[test]
    fn test_citation_format() {
        let result = RetrievalResult {
            content: "text".to_string(),
            score: 0.1,
            page_number: 4,
            source: "nda.pdf".to_string(),
            chunk_index: 7,
        };
        assert_eq!(result.to_citation(), "[nda.pdf, Page 4]");
    }
}
