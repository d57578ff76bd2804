//! Text-to-vector embedding, with batching, truncation and retry handled
//! uniformly in [`Embedder`] around a pluggable [`EmbeddingProvider`].
//!
//! Grounded on the teacher's `providers/embedding/openai.rs` (provider
//! shape, cache-key helper) and `providers/mod.rs` (the `EmbeddingProvider`
//! trait and its default `health_check`).

pub mod mock;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::domain::Vector;
use crate::error::{Error, Result};

/// A remote or local capability that turns text into dense vectors. Batching,
/// truncation and retry live in [`Embedder`]; implementors only need to make
/// one call to the underlying provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds an already-truncated, already-batched (<=100) slice of texts,
    /// returning vectors in the same order as the input.
    async fn embed_raw(&self, texts: &[String]) -> Result<Vec<Vector>>;

    fn model_name(&self) -> &str;

    fn provider_name(&self) -> &'static str;

    /// Default health check: embed a short probe string.
    async fn health_check(&self) -> Result<()> {
        self.embed_raw(&["health check".to_string()]).await?;
        Ok(())
    }
}

/// Token/dimension characteristics of a named embedding model.
#[derive(Debug, Clone, Copy)]
pub struct ModelDescriptor {
    pub max_tokens: usize,
    pub dimensions: usize,
}

pub fn model_descriptor(model: &str) -> ModelDescriptor {
    match model {
        "text-embedding-3-small" => ModelDescriptor {
            max_tokens: 8192,
            dimensions: 1536,
        },
        "text-embedding-3-large" => ModelDescriptor {
            max_tokens: 8192,
            dimensions: 3072,
        },
        "text-embedding-ada-002" => ModelDescriptor {
            max_tokens: 8191,
            dimensions: 1536,
        },
        _ => ModelDescriptor {
            max_tokens: 8192,
            dimensions: 1536,
        },
    }
}

const MAX_BATCH_SIZE: usize = 100;
const BATCH_SLEEP: Duration = Duration::from_millis(100);
const MAX_ATTEMPTS: u32 = 3;

/// Wraps an [`EmbeddingProvider`] with the batching/truncation/retry policy
/// shared by every embedding call (spec section 4.2).
pub struct Embedder {
    provider: Box<dyn EmbeddingProvider>,
    max_tokens: usize,
}

impl Embedder {
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        let max_tokens = model_descriptor(provider.model_name()).max_tokens;
        Self { provider, max_tokens }
    }

    pub fn dimensions(&self) -> usize {
        model_descriptor(self.provider.model_name()).dimensions
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn health_check(&self) -> Result<()> {
        self.provider.health_check().await
    }

    /// Embeds `texts`, preserving input order. Empty input returns `Ok(vec![])`.
    /// Purely-whitespace inputs are filtered first; if that empties the
    /// batch entirely the call fails.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let non_blank: Vec<&String> = texts.iter().filter(|t| !t.trim().is_empty()).collect();
        if non_blank.is_empty() {
            return Err(Error::invalid_argument("empty input"));
        }

        let truncated: Vec<String> = texts
            .iter()
            .map(|t| truncate_to_budget(t, self.max_tokens))
            .collect();

        let mut out = Vec::with_capacity(truncated.len());
        for (batch_idx, chunk) in truncated.chunks(MAX_BATCH_SIZE).enumerate() {
            if batch_idx > 0 {
                tokio::time::sleep(BATCH_SLEEP).await;
            }
            let vectors = self.embed_batch_with_retry(chunk).await?;
            out.extend(vectors);
        }
        Ok(out)
    }

    async fn embed_batch_with_retry(&self, batch: &[String]) -> Result<Vec<Vector>> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.provider.embed_raw(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(Error::QuotaExceeded) => {
                    error!("embedding quota exceeded, not retrying");
                    return Err(Error::QuotaExceeded);
                }
                Err(Error::AuthFailed) => {
                    error!("embedding provider authentication failed, not retrying");
                    return Err(Error::AuthFailed);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "embedding call failed, retrying");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(100) * attempt).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| Error::embedding("embedding call failed")))
    }
}

/// Conservative token estimator: ~4 chars per ASCII char (i.e. 0.25 tokens
/// each), 1 token per non-ASCII char. Truncates to 90% of `max_tokens` and
/// appends an ellipsis when truncation occurred.
fn truncate_to_budget(text: &str, max_tokens: usize) -> String {
    let budget = max_tokens as f64 * 0.9;
    let estimate: f64 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.25 } else { 1.0 })
        .sum();

    if estimate <= budget {
        return text.to_string();
    }

    let mut used = 0.0;
    let mut out = String::new();
    for c in text.chars() {
        let cost = if c.is_ascii() { 0.25 } else { 1.0 };
        if used + cost > budget {
            break;
        }
        used += cost;
        out.push(c);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ascii_text_is_not_truncated() {
        let text = "a short description";
        assert_eq!(truncate_to_budget(text, 8192), text);
    }

    #[test]
    fn long_text_is_truncated_with_ellipsis() {
        let text = "x".repeat(100_000);
        let out = truncate_to_budget(&text, 100);
        assert!(out.ends_with('…'));
        assert!(out.len() < text.len());
    }

    #[test]
    fn model_descriptor_defaults_for_unknown_model() {
        let d = model_descriptor("some-future-model");
        assert_eq!(d.dimensions, 1536);
        assert_eq!(d.max_tokens, 8192);
    }

    #[tokio::test]
    async fn embed_rejects_all_whitespace_input() {
        let embedder = Embedder::new(Box::new(mock::MockEmbeddingProvider::new()));
        let err = embedder
            .embed(&["   ".to_string(), "\t".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let embedder = Embedder::new(Box::new(mock::MockEmbeddingProvider::new()));
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        // deterministic mock: identical text always yields identical vector
        let again = embedder.embed(&texts[..1]).await.unwrap();
        assert_eq!(vectors[0], again[0]);
    }

    #[tokio::test]
    async fn embed_empty_input_returns_empty() {
        let embedder = Embedder::new(Box::new(mock::MockEmbeddingProvider::new()));
        let vectors = embedder.embed(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
