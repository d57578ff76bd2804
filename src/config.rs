//! Environment-variable configuration, in the style of the teacher's
//! `Config::from_env` / `from_env_legacy` (direct `std::env::var` reads with
//! `.unwrap_or_else` defaults and a `validate()` pass).

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_size: usize,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

/// Top-level RCI service configuration (spec section 6.5).
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub vector_store_path: String,
    pub embeddings: EmbeddingConfig,
    pub dimension: usize,
    pub cache: CacheConfig,
    pub http: HttpConfig,
}

impl RagConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            vector_store_path: env_var("RAG_VECTOR_STORE_PATH", "./data/rag-index"),
            embeddings: EmbeddingConfig {
                provider: env_var("RAG_EMBEDDING_PROVIDER", "openai"),
                model: env_var("RAG_EMBEDDING_MODEL", "text-embedding-3-small"),
                api_key: env_var("RAG_EMBEDDING_API_KEY", ""),
                base_url: std::env::var("RAG_EMBEDDING_BASE_URL").ok(),
            },
            dimension: env_var("RAG_DIMENSION", "1536")
                .parse()
                .unwrap_or(1536),
            cache: CacheConfig {
                enabled: env_var("RAG_CACHE_ENABLED", "true")
                    .parse()
                    .unwrap_or(true),
                ttl_seconds: env_var("RAG_CACHE_TTL_SECONDS", "300")
                    .parse()
                    .unwrap_or(300),
                max_size: env_var("RAG_CACHE_MAX_SIZE", "1000")
                    .parse()
                    .unwrap_or(1000),
            },
            http: HttpConfig {
                host: env_var("RAG_HTTP_HOST", "127.0.0.1"),
                port: env_var("RAG_HTTP_PORT", "8080").parse().unwrap_or(8080),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vector_store_path.trim().is_empty() {
            return Err(Error::invalid_argument("vector store path must not be empty"));
        }
        if self.dimension == 0 {
            return Err(Error::invalid_argument("dimension must be non-zero"));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(Error::invalid_argument("cache ttl must be non-zero"));
        }
        if self.cache.max_size == 0 {
            return Err(Error::invalid_argument("cache max size must be non-zero"));
        }
        if self.http.port == 0 {
            return Err(Error::invalid_argument("http port must be non-zero"));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

fn env_var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_zero_dimension() {
        let mut config = default_for_test();
        config.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_vector_store_path() {
        let mut config = default_for_test();
        config.vector_store_path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_sane_defaults() {
        assert!(default_for_test().validate().is_ok());
    }

    fn default_for_test() -> RagConfig {
        RagConfig {
            vector_store_path: "./data/rag-index".to_string(),
            embeddings: EmbeddingConfig {
                provider: "mock".to_string(),
                model: "mock-embedding".to_string(),
                api_key: String::new(),
                base_url: None,
            },
            dimension: 1536,
            cache: CacheConfig {
                enabled: true,
                ttl_seconds: 300,
                max_size: 1000,
            },
            http: HttpConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }
}
