//! Embedding generation
//!
//! Turns text into fixed-length vectors for similarity search. The dimension
//! is a system-wide contract: the store rejects vectors that do not match the
//! dimension it was opened with, so write-time and query-time embeddings must
//! come from the same provider.

mod provider;

pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider};
