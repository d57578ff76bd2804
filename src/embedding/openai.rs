use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::http_client::HttpClientPool;
use crate::domain::Vector;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};

/// Calls the OpenAI-compatible `/embeddings` endpoint. Grounded on the
/// teacher's `providers/embedding/openai.rs`.
pub struct OpenAiEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    http_client: Arc<HttpClientPool>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: model.into(),
            http_client: Arc::new(HttpClientPool::new()?),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_embeddings_from_api(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let payload = json!({
            "input": texts,
            "model": self.model,
            "encoding_format": "float",
        });

        let response = self
            .http_client
            .client()
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::AuthFailed);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("invalid response body: {e}")))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string();
            if message.to_lowercase().contains("quota") {
                return Err(Error::QuotaExceeded);
            }
            return Err(Error::embedding(message));
        }

        let data = body
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| Error::embedding("response missing data array"))?;

        let mut indexed: Vec<(usize, Vector)> = Vec::with_capacity(data.len());
        for item in data {
            let index = item
                .get("index")
                .and_then(|i| i.as_u64())
                .ok_or_else(|| Error::embedding("response item missing index"))? as usize;
            let vector: Vector = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| Error::embedding("response item missing embedding"))?
                .iter()
                .map(|n| n.as_f64().unwrap_or(0.0) as f32)
                .collect();
            indexed.push((index, vector));
        }
        indexed.sort_by_key(|(idx, _)| *idx);
        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_raw(&self, texts: &[String]) -> Result<Vec<Vector>> {
        self.fetch_embeddings_from_api(texts).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
