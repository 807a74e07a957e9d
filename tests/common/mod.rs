//! Shared test doubles: a deterministic embedding provider and a scripted
//! language model, so integration tests run without model downloads or
//! network access.

use async_trait::async_trait;
use doclens::embedding::{EmbeddingError, EmbeddingProvider};
use doclens::llm::{LlmClient, LlmError};

/// Deterministic embedding provider
///
/// Hashes byte/position pairs into a fixed-dimension histogram and
/// normalizes it, so identical text always maps to the identical unit vector.
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for HashEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[(byte as usize + i) % self.dimension] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedding"
    }
}

/// Scripted language model
///
/// Returns `route_reply` for classification prompts and `analysis_reply` for
/// everything else.
pub struct ScriptedLlm {
    pub route_reply: String,
    pub analysis_reply: String,
}

impl ScriptedLlm {
    pub fn new(route_reply: &str, analysis_reply: &str) -> Self {
        Self {
            route_reply: route_reply.to_string(),
            analysis_reply: analysis_reply.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.contains("query classifier") {
            Ok(self.route_reply.clone())
        } else {
            Ok(self.analysis_reply.clone())
        }
    }
}
