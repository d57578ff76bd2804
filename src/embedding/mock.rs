use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::domain::Vector;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Deterministic, network-free embedding provider used by integration tests
/// and the `--sync-on-start` dry-run path. Each text hashes to a stable
/// pseudo-random unit vector, so identical inputs always produce identical
/// vectors and near-duplicate inputs are not expected to score similarly.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 1536 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vector {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut state = seed;
        (0..self.dimensions)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                let bucket = (state >> 33) as u32;
                (bucket as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_raw(&self, texts: &[String]) -> Result<Vec<Vector>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
