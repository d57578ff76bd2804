//! Two-tier smart cache: an exact-key LRU tier and a semantic tier matched
//! by cosine similarity against a query embedding (spec section 4.4).
//!
//! Grounded on the teacher's `infrastructure/cache/providers/moka.rs` for
//! the overall provider shape (get/set/clear/stats/health_check) and its
//! `#[cfg(test)]` style, adapted from `moka`'s TTL cache to an explicit
//! `IndexMap`-based LRU so insertion order (needed for oldest-first
//! eviction and ordered semantic scanning) is directly observable.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;

use crate::core::locks::lock_mutex;
use crate::domain::{CacheEntry, Filters, Vector};
use crate::error::Result;
use crate::vector_store::cosine_similarity;

/// Cache-wide statistics (spec section 4.4).
#[derive(Debug, Clone, Serialize, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub total_queries: u64,
}

struct Tiers<R> {
    exact: IndexMap<String, CacheEntry<R>>,
    semantic: IndexMap<String, CacheEntry<R>>,
    hits: u64,
    misses: u64,
}

/// Configuration for [`SmartCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    pub max_age: Duration,
    pub similarity_threshold: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 1000,
            max_age: Duration::from_secs(300),
            similarity_threshold: 0.92,
        }
    }
}

/// Smart cache over search responses of type `R`, keyed by query text
/// (exact tier) and query embedding (semantic tier).
pub struct SmartCache<R> {
    config: CacheConfig,
    state: Mutex<Tiers<R>>,
}

impl<R: Clone> SmartCache<R> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Tiers {
                exact: IndexMap::new(),
                semantic: IndexMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    fn exact_key(query: &str, filters: &Filters) -> String {
        let normalized = query.trim().to_lowercase();
        let digest = md5::compute(format!("{normalized}{}", filters.canonical_json()));
        format!("{digest:x}")
    }

    /// Looks up `query`, trying the exact tier first, then (if `embedding`
    /// is given) scanning the semantic tier for a sufficiently similar
    /// cached query.
    pub fn get(
        &self,
        query: &str,
        embedding: Option<&Vector>,
        filters: &Filters,
    ) -> Result<Option<R>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let mut guard = lock_mutex(&self.state, "smart_cache.get")?;
        let now = Utc::now();
        let key = Self::exact_key(query, filters);

        if let Some(entry) = guard.exact.get(&key) {
            let age = now.signed_duration_since(entry.created_at);
            if age.to_std().unwrap_or(Duration::MAX) <= self.config.max_age {
                let response = entry.response.clone();
                if let Some(entry) = guard.exact.shift_remove(&key) {
                    let mut entry = entry;
                    entry.last_accessed = now;
                    entry.hit_count += 1;
                    guard.exact.insert(key, entry);
                }
                guard.hits += 1;
                return Ok(Some(response));
            } else {
                guard.exact.shift_remove(&key);
            }
        }

        if let Some(qv) = embedding {
            let mut found = None;
            let expired: Vec<String> = guard
                .semantic
                .iter()
                .filter(|(_, e)| {
                    now.signed_duration_since(e.created_at).to_std().unwrap_or(Duration::MAX)
                        > self.config.max_age
                })
                .map(|(k, _)| k.clone())
                .collect();
            for k in expired {
                guard.semantic.shift_remove(&k);
            }

            for entry in guard.semantic.values() {
                if let Some(stored) = &entry.embedding {
                    if matches!(cosine_similarity(qv, stored), Ok(sim) if sim >= self.config.similarity_threshold)
                    {
                        found = Some(entry.response.clone());
                        break;
                    }
                }
            }
            if let Some(response) = found {
                guard.hits += 1;
                return Ok(Some(response));
            }
        }

        guard.misses += 1;
        Ok(None)
    }

    /// Inserts a response into the exact tier, and into the semantic tier
    /// if an embedding is supplied. Evicts the oldest-inserted entry from
    /// each tier once `max_size` is reached.
    pub fn set(
        &self,
        query: &str,
        response: R,
        embedding: Option<Vector>,
        filters: &Filters,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let mut guard = lock_mutex(&self.state, "smart_cache.set")?;
        let now = Utc::now();
        let key = Self::exact_key(query, filters);

        if guard.exact.len() >= self.config.max_size {
            guard.exact.shift_remove_index(0);
        }
        if guard.semantic.len() >= self.config.max_size {
            guard.semantic.shift_remove_index(0);
        }

        let entry = CacheEntry {
            response,
            embedding: embedding.clone(),
            created_at: now,
            last_accessed: now,
            hit_count: 0,
        };

        if let Some(embedding) = embedding {
            guard.semantic.insert(
                key.clone(),
                CacheEntry {
                    response: entry.response.clone(),
                    embedding: Some(embedding),
                    created_at: now,
                    last_accessed: now,
                    hit_count: 0,
                },
            );
        }
        guard.exact.insert(key, entry);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let mut guard = lock_mutex(&self.state, "smart_cache.clear")?;
        guard.exact.clear();
        guard.semantic.clear();
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let guard = lock_mutex(&self.state, "smart_cache.stats")?;
        let total = guard.hits + guard.misses;
        Ok(CacheStats {
            size: guard.exact.len(),
            hits: guard.hits,
            misses: guard.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                guard.hits as f64 / total as f64
            },
            total_queries: total,
        })
    }
}
