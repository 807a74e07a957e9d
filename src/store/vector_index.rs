/// HNSW vector index for nearest-neighbor search
use hnsw_rs::prelude::*;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

/// Nearest-neighbor match with ID and distance
#[derive(Debug, Clone)]
pub struct NearestNeighbor {
    /// ID of the indexed vector (the chunk index)
    pub id: u64,
    /// Cosine distance (0.0 = identical, lower = more similar)
    pub distance: f32,
}

/// HNSW vector index wrapper
///
/// The index is in-memory; the owning store persists embeddings alongside
/// chunk metadata and rebuilds the index when it is reopened.
pub struct VectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    ef_construction: usize,
    m: usize,
    count: RwLock<u64>,
}

impl VectorIndex {
    /// Create a new vector index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match embedding dimension)
    /// * `ef_construction` - HNSW construction parameter (higher = better recall, slower build)
    /// * `m` - HNSW M parameter (number of connections per layer)
    pub fn new(dimension: usize, ef_construction: usize, m: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            m,
            dimension,
            ef_construction,
            200, // max_nb_connection
            DistCosine,
        );

        Self {
            index: RwLock::new(index),
            dimension,
            ef_construction,
            m,
            count: RwLock::new(0),
        }
    }

    /// Insert a vector keyed by its chunk index
    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let data = vector.to_vec();

        let index = self.index.write().unwrap();
        index.insert((&data, id as usize));

        let mut count = self.count.write().unwrap();
        *count += 1;

        Ok(())
    }

    /// Search for the k nearest neighbors
    ///
    /// Returns matches ordered by ascending cosine distance. An empty index
    /// yields an empty result, not an error.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<NearestNeighbor>, VectorIndexError> {
        if query.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let index = self.index.read().unwrap();
        let results = index.search(query, k, ef_search);

        Ok(results
            .into_iter()
            .map(|neighbor| NearestNeighbor {
                id: neighbor.d_id as u64,
                distance: neighbor.distance,
            })
            .collect())
    }

    /// Number of vectors in the index
    pub fn len(&self) -> u64 {
        *self.count.read().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Remove all vectors, leaving the index usable for new inserts
    pub fn clear(&self) {
        let mut index = self.index.write().unwrap();
        *index = Hnsw::<f32, DistCosine>::new(
            self.m,
            self.dimension,
            self.ef_construction,
            200, // max_nb_connection
            DistCosine,
        );

        let mut count = self.count.write().unwrap();
        *count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vec(dimension: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(16, 200, 16);
        assert_eq!(index.dimension(), 16);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let index = VectorIndex::new(16, 200, 16);

        index.insert(0, &unit_vec(16, 0)).unwrap();
        index.insert(1, &unit_vec(16, 1)).unwrap();

        let mut near = unit_vec(16, 0);
        near[1] = 0.1;
        index.insert(2, &near).unwrap();

        assert_eq!(index.len(), 3);

        let results = index.search(&unit_vec(16, 0), 2, 50).unwrap();
        assert_eq!(results.len(), 2);

        // Exact match comes back first with ~zero distance
        assert_eq!(results[0].id, 0);
        assert!(results[0].distance < 1e-3);
        assert!(results[0].distance <= results[1].distance);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(16, 200, 16);
        let results = index.search(&unit_vec(16, 0), 5, 50).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_dimension_validation() {
        let index = VectorIndex::new(16, 200, 16);
        assert!(index.insert(0, &[1.0; 8]).is_err());
        assert!(index.search(&[1.0; 8], 1, 50).is_err());
    }

    #[test]
    fn test_clear() {
        let index = VectorIndex::new(16, 200, 16);
        index.insert(0, &unit_vec(16, 0)).unwrap();
        assert_eq!(index.len(), 1);

        index.clear();
        assert!(index.is_empty());

        // Still usable after clearing
        index.insert(1, &unit_vec(16, 1)).unwrap();
        assert_eq!(index.len(), 1);
        let results = index.search(&unit_vec(16, 1), 1, 50).unwrap();
        assert_eq!(results[0].id, 1);
    }
}
