//! Orchestrates Parser, Embedder, VectorStore and SmartCache into the
//! `Sync` / `Search` / `Status` / `ClearCache` operations of spec section 4.5.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::{CacheConfig, SmartCache};
use crate::config::RagConfig;
use crate::domain::{ComponentDoc, FacetType, Filters, Vector, VectorDocument, VectorMetadata};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::parser::{read_package_manifest, ParseStatus, Parser};
use crate::vector_store::VectorStore;

const SYNC_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncRequest {
    pub source_path: String,
    #[serde(default)]
    pub packages: Option<Vec<String>>,
    #[serde(default)]
    pub force_reindex: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub processed_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub filters: Option<Filters>,
}

fn default_top_k() -> usize {
    5
}
fn default_threshold() -> f32 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub components: Vec<ComponentDoc>,
    pub scores: Vec<f32>,
    pub confidence: f32,
    pub suggestions: Vec<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub available: bool,
    pub stats: Option<crate::vector_store::StoreStats>,
    pub config: StatusConfig,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusConfig {
    pub vector_store_path: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub cache_enabled: bool,
}

/// The RCI service: owns the Parser, Embedder, VectorStore and SmartCache
/// for the lifetime of the process.
pub struct RciService {
    parser: Parser,
    embedder: Embedder,
    vector_store: VectorStore,
    cache: SmartCache<SearchResponse>,
    config: RagConfig,
}

impl RciService {
    pub async fn new(config: RagConfig, embedder: Embedder) -> Result<Self> {
        let vector_store =
            VectorStore::initialize(&config.vector_store_path, config.dimension).await?;
        let cache = SmartCache::new(CacheConfig {
            enabled: config.cache.enabled,
            max_size: config.cache.max_size,
            max_age: std::time::Duration::from_secs(config.cache.ttl_seconds),
            ..CacheConfig::default()
        });
        Ok(Self {
            parser: Parser::new(),
            embedder,
            vector_store,
            cache,
            config,
        })
    }

    pub async fn sync(&self, request: SyncRequest) -> Result<SyncResponse> {
        let started = Instant::now();
        let source_root = Path::new(&request.source_path);
        let (package_name, _) = read_package_manifest(source_root).await;

        let parsed = self
            .parser
            .parse_all_components(source_root, &package_name)
            .await?;
        let processed_count = parsed.len();

        let filtered: Vec<_> = match &request.packages {
            Some(packages) if !packages.is_empty() => parsed
                .into_iter()
                .filter(|p| packages.contains(&p.info.package_name))
                .collect(),
            _ => parsed,
        };

        if request.force_reindex {
            self.vector_store.clear().await?;
        }

        let mut success_count = 0usize;
        let mut failed_count = 0usize;
        let mut errors = Vec::new();

        for batch in filtered.chunks(SYNC_BATCH_SIZE) {
            let mut batch_vectors = Vec::new();
            for parsed_component in batch {
                if parsed_component.status == ParseStatus::Error {
                    failed_count += 1;
                    if let Some(e) = &parsed_component.error {
                        errors.push(format!(
                            "{}: {e}",
                            parsed_component.info.component_name
                        ));
                    }
                    continue;
                }
                match create_component_vectors(&self.embedder, &parsed_component.info).await {
                    Ok(vectors) => {
                        success_count += 1;
                        batch_vectors.extend(vectors);
                    }
                    Err(e) => {
                        failed_count += 1;
                        warn!(component = %parsed_component.info.component_name, error = %e, "failed to embed component");
                        errors.push(format!("{}: {e}", parsed_component.info.component_name));
                    }
                }
            }
            if !batch_vectors.is_empty() {
                self.vector_store.add_batch(batch_vectors).await?;
            }
        }

        self.cache.clear()?;

        let status = if errors.is_empty() {
            SyncStatus::Success
        } else if success_count > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Failed
        };

        let duration_ms = started.elapsed().as_millis();
        info!(
            processed_count,
            success_count, failed_count, duration_ms, "sync completed"
        );

        Ok(SyncResponse {
            status,
            processed_count,
            success_count,
            failed_count,
            errors,
            duration_ms,
        })
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        if request.query.trim().is_empty() {
            return Err(Error::invalid_argument("query must not be empty"));
        }
        if !(1..=1000).contains(&request.top_k) {
            return Err(Error::invalid_argument("topK must be between 1 and 1000"));
        }
        let filters = request.filters.unwrap_or_default();

        let query_vector = self
            .embedder
            .embed(&[request.query.clone()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::search("embedding returned no vector for query"))?;

        if let Some(mut cached) = self.cache.get(&request.query, Some(&query_vector), &filters)? {
            cached.duration_ms = started.elapsed().as_millis();
            return Ok(cached);
        }

        let internal_k = (request.top_k.saturating_mul(20)).clamp(request.top_k, 1000);
        let hits = if filters.is_empty() {
            self.vector_store
                .top_k(&query_vector, internal_k, request.threshold)?
        } else {
            self.vector_store
                .top_k_filtered(&query_vector, &filters, internal_k, request.threshold)?
        };

        let response = self.rank_and_build_response(&request, hits, started)?;
        self.cache
            .set(&request.query, response.clone(), Some(query_vector), &filters)?;
        Ok(response)
    }

    fn rank_and_build_response(
        &self,
        request: &SearchRequest,
        hits: Vec<(f32, VectorDocument)>,
        started: Instant,
    ) -> Result<SearchResponse> {
        let query_lower = request.query.to_lowercase();
        let mut groups: HashMap<(String, String), GroupAccumulator> = HashMap::new();

        for (similarity, hit) in hits {
            let key = (
                hit.metadata.package_name.clone(),
                hit.metadata.component_name.clone(),
            );

            let mut score = similarity;
            score *= hit.metadata.facet_type.score_weight();
            if hit.content.to_lowercase().contains(&query_lower) {
                score *= 1.3;
            }
            score = score.clamp(0.0, 1.0);

            let entry = groups.entry(key).or_insert_with(|| GroupAccumulator {
                scores: Vec::new(),
                metadata: hit.metadata.clone(),
            });
            entry.scores.push(score);
        }

        let mut ranked: Vec<(f32, VectorMetadata)> = groups
            .into_values()
            .map(|acc| {
                let max = acc.scores.iter().cloned().fold(0.0_f32, f32::max);
                let mean = acc.scores.iter().sum::<f32>() / acc.scores.len() as f32;
                (max * 0.7 + mean * 0.3, acc.metadata)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.package_name.cmp(&b.1.package_name))
                .then_with(|| a.1.component_name.cmp(&b.1.component_name))
        });
        ranked.truncate(request.top_k);

        let scores: Vec<f32> = ranked.iter().map(|(s, _)| *s).collect();
        let components: Vec<ComponentDoc> = ranked
            .iter()
            .map(|(_, meta)| ComponentDoc {
                package_name: meta.package_name.clone(),
                component_name: meta.component_name.clone(),
                description: String::new(),
                api: String::new(),
                examples: Vec::new(),
                tags: meta.tags.clone(),
                version: meta.version.clone(),
                dependencies: Vec::new(),
                updated_at: Utc::now(),
            })
            .collect();

        let confidence = if scores.is_empty() {
            0.0
        } else {
            let mean = scores.iter().sum::<f32>() / scores.len() as f32;
            let max = scores.iter().cloned().fold(0.0_f32, f32::max);
            mean * 0.6 + max * 0.4
        };

        let suggestions = match components.len() {
            0 => vec![
                "Try using more general terms in your search".to_string(),
                "Check if the component name is correct".to_string(),
            ],
            1 => vec![format!("Found perfect match: {}", components[0].component_name)],
            n => vec![
                format!("Found {n} relevant components"),
                format!("Top match: {}", components[0].component_name),
            ],
        };

        Ok(SearchResponse {
            components,
            scores,
            confidence,
            suggestions,
            duration_ms: started.elapsed().as_millis(),
        })
    }

    pub fn status(&self) -> Result<StatusResponse> {
        let (available, stats) = match self.vector_store.stats() {
            Ok(stats) => (true, Some(stats)),
            Err(_) => (false, None),
        };
        Ok(StatusResponse {
            available,
            stats,
            config: StatusConfig {
                vector_store_path: self.config.vector_store_path.clone(),
                embedding_model: self.config.embeddings.model.clone(),
                dimension: self.config.dimension,
                cache_enabled: self.config.cache.enabled,
            },
            checked_at: Utc::now(),
        })
    }

    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }
}

struct GroupAccumulator {
    scores: Vec<f32>,
    metadata: VectorMetadata,
}

/// Builds up to `1 (description) + 1 (api) + min(3, examples)` texts for a
/// component and embeds them in a single batched call (spec section 4.5.3).
async fn create_component_vectors(
    embedder: &Embedder,
    doc: &ComponentDoc,
) -> Result<Vec<VectorDocument>> {
    let mut texts = Vec::new();
    let mut facets = Vec::new();

    if !doc.description.trim().is_empty() {
        texts.push(doc.description.clone());
        facets.push(FacetType::Description);
    }
    if !doc.api.trim().is_empty() && doc.api != "API documentation not available" {
        texts.push(doc.api.clone());
        facets.push(FacetType::Api);
    }
    for example in doc.examples.iter().filter(|e| !e.trim().is_empty()).take(3) {
        texts.push(example.clone());
        facets.push(FacetType::Example);
    }

    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors: Vec<Vector> = embedder.embed(&texts).await?;
    Ok(facets
        .into_iter()
        .zip(texts.into_iter())
        .zip(vectors.into_iter())
        .map(|((facet_type, content), embedding)| VectorDocument {
            id: VectorDocument::make_id(&doc.component_name, facet_type, &content),
            content,
            embedding,
            metadata: VectorMetadata {
                component_name: doc.component_name.clone(),
                package_name: doc.package_name.clone(),
                facet_type,
                tags: doc.tags.clone(),
                version: doc.version.clone(),
            },
        })
        .collect())
}
