use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dense embedding vector. Always unit length is NOT guaranteed by the
/// type; callers normalise where the algorithm requires it (cosine
/// similarity divides by norm regardless).
pub type Vector = Vec<f32>;

/// Canonical per-component record produced by the parser and reconstructed
/// (in minimal form) from stored metadata during search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDoc {
    pub package_name: String,
    pub component_name: String,
    pub description: String,
    pub api: String,
    pub examples: Vec<String>,
    pub tags: BTreeSet<String>,
    pub version: String,
    pub dependencies: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl ComponentDoc {
    /// An empty doc used to carry a component's identity when parsing fails.
    pub fn empty(component_name: impl Into<String>) -> Self {
        Self {
            package_name: String::new(),
            component_name: component_name.into(),
            description: String::new(),
            api: String::new(),
            examples: Vec::new(),
            tags: BTreeSet::new(),
            version: String::new(),
            dependencies: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// True iff at least one facet has content, i.e. this doc can produce
    /// vectors (spec section 3, ComponentDoc invariants).
    pub fn has_content(&self) -> bool {
        !self.description.trim().is_empty()
            || (!self.api.trim().is_empty() && self.api != "API documentation not available")
            || self.examples.iter().any(|e| !e.trim().is_empty())
    }
}

/// The facet a [`VectorDocument`] was embedded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetType {
    Description,
    Api,
    Example,
    Usage,
}

impl FacetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetType::Description => "description",
            FacetType::Api => "api",
            FacetType::Example => "example",
            FacetType::Usage => "usage",
        }
    }

    /// Scoring weight applied during search result aggregation, section 4.5.2.
    pub fn score_weight(&self) -> f32 {
        match self {
            FacetType::Description => 1.2,
            FacetType::Api => 1.0,
            FacetType::Example => 0.8,
            FacetType::Usage => 0.8,
        }
    }
}

/// Metadata stored alongside each embedded vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub component_name: String,
    pub package_name: String,
    #[serde(rename = "type")]
    pub facet_type: FacetType,
    pub tags: BTreeSet<String>,
    pub version: String,
}

/// A single embedded, persisted record (spec section 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub content: String,
    pub embedding: Vector,
    pub metadata: VectorMetadata,
}

impl VectorDocument {
    /// Content-addressed id: `<componentName>-<facetType>-<md5(...)[:8]>`.
    pub fn make_id(component_name: &str, facet_type: FacetType, content: &str) -> String {
        let digest = md5::compute(format!("{component_name}{}{content}", facet_type.as_str()));
        let hex = format!("{digest:x}");
        format!("{component_name}-{}-{}", facet_type.as_str(), &hex[..8])
    }
}

/// Filters accepted by `TopKFiltered` and the HTTP search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.package_name.is_none()
            && self.component_name.is_none()
            && self.tags.is_none()
            && self.version.is_none()
    }

    pub fn matches(&self, meta: &VectorMetadata) -> bool {
        if let Some(pkg) = &self.package_name {
            if pkg != &meta.package_name {
                return false;
            }
        }
        if let Some(name) = &self.component_name {
            if name != &meta.component_name {
                return false;
            }
        }
        if let Some(version) = &self.version {
            if version != &meta.version {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| meta.tags.contains(t)) {
                return false;
            }
        }
        true
    }

    /// Stable canonical JSON, used as part of the smart cache's exact key.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A stored cache entry: the cached response, optionally an embedding for
/// semantic-tier matching, and bookkeeping fields.
#[derive(Debug, Clone)]
pub struct CacheEntry<R> {
    pub response: R,
    pub embedding: Option<Vector>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub hit_count: u64,
}
