//! File-backed dense vector index: `documents.json`, `vectors.json` and
//! `metadata.json` under a base directory, guarded by a single `RwLock` so
//! reads (`TopK`) and writes (`AddBatch`, `Clear`) are serialisable.
//!
//! Grounded on the teacher's `providers/vector_store/filesystem.rs` (the
//! `RwLock<HashMap<...>>` + serde_json read/write idiom) and
//! `core/locks.rs` (poison-safe lock helpers).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::locks::{lock_rwlock_read, lock_rwlock_write};
use crate::domain::{Filters, Vector, VectorDocument};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    id: String,
    embedding: Vector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMetadata {
    total_documents: usize,
    last_updated: DateTime<Utc>,
    version: String,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self {
            total_documents: 0,
            last_updated: Utc::now(),
            version: "1.0.0".to_string(),
        }
    }
}

/// Aggregate statistics returned by [`VectorStore::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_components: usize,
    pub total_documents: usize,
    pub index_size: u64,
    pub last_updated: DateTime<Utc>,
    pub package_stats: HashMap<String, usize>,
}

struct StoreState {
    documents: Vec<VectorDocument>,
    meta: StoreMetadata,
}

/// File-backed vector store rooted at `base_path`, enforcing a fixed
/// embedding dimension on every write and query (spec section 6.5).
pub struct VectorStore {
    base_path: PathBuf,
    dim: usize,
    state: RwLock<StoreState>,
}

impl VectorStore {
    /// Creates `base_path` if absent and loads (or initialises) the three
    /// backing files. `dim` is the embedding dimension enforced on every
    /// subsequent `add_batch`/`top_k`/`top_k_filtered` call.
    pub async fn initialize(base_path: impl Into<PathBuf>, dim: usize) -> Result<Self> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path).await?;

        let documents = match tokio::fs::read(documents_path(&base_path)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(_) => Vec::new(),
        };
        let meta = match tokio::fs::read(metadata_path(&base_path)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(_) => StoreMetadata::default(),
        };

        let store = Self {
            base_path,
            dim,
            state: RwLock::new(StoreState { documents, meta }),
        };
        store.flush_locked(&lock_rwlock_read(&store.state, "initialize")?)?;
        Ok(store)
    }

    /// Inserts any documents whose id is not already present; ignores
    /// duplicates (idempotent on repeated ids). Rejects the whole batch if
    /// any embedding's length does not match the store's configured
    /// dimension.
    pub async fn add_batch(&self, docs: Vec<VectorDocument>) -> Result<usize> {
        for doc in &docs {
            if doc.embedding.len() != self.dim {
                return Err(Error::vector_store(format!(
                    "embedding for {} has length {}, expected {}",
                    doc.id,
                    doc.embedding.len(),
                    self.dim
                )));
            }
        }

        let mut inserted = 0usize;
        {
            let mut guard = lock_rwlock_write(&self.state, "add_batch")?;
            let existing: std::collections::HashSet<String> =
                guard.documents.iter().map(|d| d.id.clone()).collect();
            for doc in docs {
                if existing.contains(&doc.id) {
                    continue;
                }
                guard.documents.push(doc);
                inserted += 1;
            }
            guard.meta.total_documents = guard.documents.len();
            guard.meta.last_updated = Utc::now();
        }
        self.persist().await?;
        Ok(inserted)
    }

    /// Top-k by cosine similarity, no metadata filter. Returns documents
    /// paired with their similarity score, highest first.
    pub fn top_k(
        &self,
        query: &Vector,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(f32, VectorDocument)>> {
        self.top_k_filtered(query, &Filters::default(), k, threshold)
    }

    /// Top-k by cosine similarity, restricted to documents whose metadata
    /// matches `filters`. Returns documents paired with their similarity
    /// score, highest first. Errors if `query`'s length does not match the
    /// store's configured dimension.
    pub fn top_k_filtered(
        &self,
        query: &Vector,
        filters: &Filters,
        k: usize,
        threshold: f32,
    ) -> Result<Vec<(f32, VectorDocument)>> {
        if query.len() != self.dim {
            return Err(Error::vector_store(format!(
                "query embedding has length {}, expected {}",
                query.len(),
                self.dim
            )));
        }

        let guard = lock_rwlock_read(&self.state, "top_k_filtered")?;
        let mut scored: Vec<(f32, &VectorDocument)> = guard
            .documents
            .iter()
            .filter(|d| filters.is_empty() || filters.matches(&d.metadata))
            .map(|d| Ok::<_, Error>((cosine_similarity(query, &d.embedding)?, d)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|(score, _)| *score >= threshold)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, d)| (score, d.clone()))
            .collect())
    }

    pub async fn delete(&self, ids: &[String]) -> Result<usize> {
        let removed;
        {
            let mut guard = lock_rwlock_write(&self.state, "delete")?;
            let before = guard.documents.len();
            guard.documents.retain(|d| !ids.contains(&d.id));
            removed = before - guard.documents.len();
            guard.meta.total_documents = guard.documents.len();
            guard.meta.last_updated = Utc::now();
        }
        self.persist().await?;
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        {
            let mut guard = lock_rwlock_write(&self.state, "clear")?;
            guard.documents.clear();
            guard.meta = StoreMetadata::default();
        }
        self.persist().await
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let guard = lock_rwlock_read(&self.state, "stats")?;
        let total_components = guard
            .documents
            .iter()
            .map(|d| (d.metadata.package_name.clone(), d.metadata.component_name.clone()))
            .collect::<std::collections::HashSet<_>>()
            .len();

        let mut package_stats: HashMap<String, usize> = HashMap::new();
        for doc in &guard.documents {
            *package_stats.entry(doc.metadata.package_name.clone()).or_insert(0) += 1;
        }

        let index_size = [documents_path(&self.base_path), vectors_path(&self.base_path)]
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        Ok(StoreStats {
            total_components,
            total_documents: guard.documents.len(),
            index_size,
            last_updated: guard.meta.last_updated,
            package_stats,
        })
    }

    async fn persist(&self) -> Result<()> {
        let guard = lock_rwlock_read(&self.state, "persist")?;
        self.flush_locked(&guard)
    }

    /// Writes all three backing files via write-to-temp-then-rename so a
    /// crash mid-write leaves either the previous or the new state readable.
    fn flush_locked(&self, guard: &StoreState) -> Result<()> {
        let vectors: Vec<StoredVector> = guard
            .documents
            .iter()
            .map(|d| StoredVector {
                id: d.id.clone(),
                embedding: d.embedding.clone(),
            })
            .collect();

        atomic_write_json(&documents_path(&self.base_path), &guard.documents)?;
        atomic_write_json(&vectors_path(&self.base_path), &vectors)?;
        atomic_write_json(&metadata_path(&self.base_path), &guard.meta)?;
        Ok(())
    }
}

fn documents_path(base: &Path) -> PathBuf {
    base.join("documents.json")
}
fn vectors_path(base: &Path) -> PathBuf {
    base.join("vectors.json")
}
fn metadata_path(base: &Path) -> PathBuf {
    base.join("metadata.json")
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, bytes).map_err(Error::from)?;
    std::fs::rename(&tmp_path, path).map_err(Error::from)?;
    Ok(())
}

/// `dot(a,b) / (||a|| * ||b||)`; zero if either vector has zero norm.
/// A length mismatch is a caller error, not a score: it returns
/// `Err(Error::VectorStore)` rather than silently scoring as `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::vector_store(format!(
            "cannot compare vectors of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FacetType, VectorMetadata};
    use std::collections::BTreeSet;

    fn doc(id: &str, embedding: Vector, package: &str, component: &str) -> VectorDocument {
        VectorDocument {
            id: id.to_string(),
            content: "content".to_string(),
            embedding,
            metadata: VectorMetadata {
                component_name: component.to_string(),
                package_name: package.to_string(),
                facet_type: FacetType::Description,
                tags: BTreeSet::new(),
                version: "1.0.0".to_string(),
            },
        }
    }

    #[test]
    fn cosine_self_similarity_is_one() {
        let v = vec![0.3, 0.1, 0.9, -0.4];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_vector_is_zero() {
        let v = vec![0.3, 0.1, 0.9];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&v, &zero).unwrap(), 0.0);
    }

    #[test]
    fn cosine_with_mismatched_lengths_is_an_error() {
        let v = vec![0.3, 0.1, 0.9];
        let short = vec![0.3, 0.1];
        assert!(cosine_similarity(&v, &short).is_err());
    }

    #[tokio::test]
    async fn add_batch_is_idempotent_on_repeated_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VectorStore::initialize(tmp.path(), 2).await.unwrap();
        let d = doc("a-description-aaaaaaaa", vec![1.0, 0.0], "pkg", "A");
        let inserted_first = store.add_batch(vec![d.clone()]).await.unwrap();
        let inserted_second = store.add_batch(vec![d]).await.unwrap();
        assert_eq!(inserted_first, 1);
        assert_eq!(inserted_second, 0);
        assert_eq!(store.stats().unwrap().total_documents, 1);
    }

    #[tokio::test]
    async fn add_batch_rejects_mismatched_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VectorStore::initialize(tmp.path(), 2).await.unwrap();
        let d = doc("a-description-aaaaaaaa", vec![1.0, 0.0, 0.0], "pkg", "A");
        assert!(store.add_batch(vec![d]).await.is_err());
    }

    #[tokio::test]
    async fn top_k_rejects_mismatched_query_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VectorStore::initialize(tmp.path(), 2).await.unwrap();
        assert!(store.top_k(&vec![1.0, 0.0, 0.0], 1, 0.0).is_err());
    }

    #[tokio::test]
    async fn top_k_respects_threshold_and_k_and_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VectorStore::initialize(tmp.path(), 2).await.unwrap();
        store
            .add_batch(vec![
                doc("a-description-11111111", vec![1.0, 0.0], "pkg", "A"),
                doc("b-description-22222222", vec![0.9, 0.1], "pkg", "B"),
                doc("c-description-33333333", vec![-1.0, 0.0], "pkg", "C"),
            ])
            .await
            .unwrap();

        let hits = store.top_k(&vec![1.0, 0.0], 1, 0.5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.metadata.component_name, "A");
    }

    #[tokio::test]
    async fn top_k_filtered_by_package_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = VectorStore::initialize(tmp.path(), 2).await.unwrap();
        store
            .add_batch(vec![
                doc("a-description-11111111", vec![1.0, 0.0], "pkg-one", "A"),
                doc("b-description-22222222", vec![1.0, 0.0], "pkg-two", "B"),
            ])
            .await
            .unwrap();

        let filters = Filters {
            package_name: Some("pkg-one".to_string()),
            ..Default::default()
        };
        let hits = store.top_k_filtered(&vec![1.0, 0.0], &filters, 10, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.metadata.package_name, "pkg-one");
    }
}
