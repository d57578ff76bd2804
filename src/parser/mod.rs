//! Walks a component source tree and emits canonical [`ComponentDoc`] records.
//!
//! Grounded on the teacher's filesystem-walking providers
//! (`providers/vector_store/filesystem.rs`), adapted from sharded vector
//! storage to directory-per-component documentation parsing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::domain::ComponentDoc;
use crate::error::{Error, Result};

/// Outcome of parsing one component directory.
#[derive(Debug, Clone)]
pub struct ParsedComponent {
    pub info: ComponentDoc,
    pub file_path: PathBuf,
    pub status: ParseStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Success,
    Error,
}

static DEP_IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"from\s+['"]\.\./([^'"/]+)"#).unwrap());

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Reads `<source_root>/package.json` and returns `(name, version)`,
/// falling back to the source root's directory name and `"1.0.0"`
/// respectively when the manifest is missing or incomplete.
pub async fn read_package_manifest(source_root: &Path) -> (String, String) {
    let fallback_name = source_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown-package")
        .to_string();

    let Ok(content) = tokio::fs::read_to_string(source_root.join("package.json")).await else {
        return (fallback_name, "1.0.0".to_string());
    };
    let parsed: PackageJson = serde_json::from_str(&content).unwrap_or_default();
    (
        parsed.name.unwrap_or(fallback_name),
        parsed.version.unwrap_or_else(|| "1.0.0".to_string()),
    )
}

/// Stateless parser over a source tree rooted at `source_root`.
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Parses every immediate, non-underscore-prefixed subdirectory of
    /// `<source_root>/components` into a [`ParsedComponent`].
    pub async fn parse_all_components(
        &self,
        source_root: &Path,
        package_name: &str,
    ) -> Result<Vec<ParsedComponent>> {
        let components_dir = source_root.join("components");
        let (_, version) = read_package_manifest(source_root).await;

        let entries = match tokio::fs::read_dir(&components_dir).await {
            Ok(mut rd) => {
                let mut dirs = Vec::new();
                loop {
                    match rd.next_entry().await {
                        Ok(Some(entry)) => {
                            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                                dirs.push(entry.path());
                            }
                        }
                        Ok(None) => break,
                        Err(e) => return Err(Error::from(e)),
                    }
                }
                dirs
            }
            Err(e) => {
                return Err(match e.kind() {
                    std::io::ErrorKind::NotFound => Error::not_found(format!(
                        "components dir {}",
                        components_dir.display()
                    )),
                    std::io::ErrorKind::PermissionDenied => Error::permission_denied(format!(
                        "components dir {}",
                        components_dir.display()
                    )),
                    _ => Error::invalid_argument(format!(
                        "cannot list components dir {}: {e}",
                        components_dir.display()
                    )),
                })
            }
        };

        let mut results = Vec::with_capacity(entries.len());
        for dir in entries {
            let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if dir_name.starts_with('_') {
                continue;
            }
            let parsed = self
                .parse_one(&dir, dir_name, package_name, &version)
                .await;
            results.push(parsed);
        }
        Ok(results)
    }

    async fn parse_one(
        &self,
        dir: &Path,
        dir_name: &str,
        package_name: &str,
        version: &str,
    ) -> ParsedComponent {
        let component_name = capitalize_component_name(dir_name);
        match self
            .parse_one_inner(dir, &component_name, package_name, version)
            .await
        {
            Ok(info) => ParsedComponent {
                info,
                file_path: dir.to_path_buf(),
                status: ParseStatus::Success,
                error: None,
            },
            Err(e) => ParsedComponent {
                info: ComponentDoc::empty(component_name),
                file_path: dir.to_path_buf(),
                status: ParseStatus::Error,
                error: Some(e.to_string()),
            },
        }
    }

    async fn parse_one_inner(
        &self,
        dir: &Path,
        component_name: &str,
        package_name: &str,
        version: &str,
    ) -> Result<ComponentDoc> {
        let doc_path = dir.join("index.en-US.md");
        let doc_text = tokio::fs::read_to_string(&doc_path).await.ok();

        let description = doc_text
            .as_deref()
            .and_then(extract_description)
            .unwrap_or_else(|| format!("{component_name} component"));

        let api = doc_text
            .as_deref()
            .and_then(extract_api)
            .unwrap_or_else(|| "API documentation not available".to_string());

        let examples = extract_examples(&dir.join("demo")).await;

        let tags = tags_for(component_name);

        let dependencies = extract_dependencies(&dir.join("index.ts")).await;

        Ok(ComponentDoc {
            package_name: package_name.to_string(),
            component_name: component_name.to_string(),
            description,
            api,
            examples,
            tags,
            version: version.to_string(),
            dependencies,
            updated_at: Utc::now(),
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// `button-group` -> `ButtonGroup`.
fn capitalize_component_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Text between the first `---` separator line and the first subsequent
/// `## `-prefixed heading, with blank/separator lines stripped and joined
/// by single spaces.
fn extract_description(doc: &str) -> Option<String> {
    let lines: Vec<&str> = doc.lines().collect();
    let start = lines.iter().position(|l| l.trim() == "---")? + 1;
    let end = lines[start..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map(|i| start + i)
        .unwrap_or(lines.len());

    let body: Vec<&str> = lines[start..end]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && *l != "---")
        .copied()
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body.join(" "))
    }
}

/// Text from the first `## API` heading up to (excluding) the next `## `
/// heading that isn't `## API`.
fn extract_api(doc: &str) -> Option<String> {
    let lines: Vec<&str> = doc.lines().collect();
    let start = lines.iter().position(|l| l.trim() == "## API")? + 1;
    let end = lines[start..]
        .iter()
        .position(|l| l.starts_with("## ") && l.trim() != "## API")
        .map(|i| start + i)
        .unwrap_or(lines.len());

    let body: Vec<&str> = lines[start..end]
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .copied()
        .collect();

    if body.is_empty() {
        None
    } else {
        Some(body.join(" "))
    }
}

/// Up to the first 3 `.tsx` files in `demo_dir`, lexicographically sorted,
/// with `import` lines stripped; empty-after-stripping files are discarded.
async fn extract_examples(demo_dir: &Path) -> Vec<String> {
    let Ok(mut rd) = tokio::fs::read_dir(demo_dir).await else {
        return Vec::new();
    };

    let mut files = Vec::new();
    while let Ok(Some(entry)) = rd.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("tsx") {
            files.push(path);
        }
    }
    files.sort();

    let mut examples = Vec::new();
    for path in files.into_iter().take(3) {
        if let Ok(content) = tokio::fs::read_to_string(&path).await {
            let stripped: String = content
                .lines()
                .filter(|l| !l.trim_start().starts_with("import"))
                .collect::<Vec<_>>()
                .join("\n");
            if !stripped.trim().is_empty() {
                examples.push(stripped.trim().to_string());
            }
        }
    }
    examples
}

/// Scans `index.ts` for `from '../segment...'` imports and capitalizes the
/// first path segment of each.
async fn extract_dependencies(index_ts: &Path) -> Vec<String> {
    let Ok(content) = tokio::fs::read_to_string(index_ts).await else {
        return Vec::new();
    };
    DEP_IMPORT_RE
        .captures_iter(&content)
        .map(|c| capitalize_component_name(&c[1]))
        .collect()
}

/// Static tag inference table (spec section 4.1). Keys are lowercase
/// component directory names.
fn tags_for(component_name: &str) -> BTreeSet<String> {
    let key = component_name.to_lowercase();
    let mut tags: BTreeSet<String> = match key.as_str() {
        "button" => ["form", "action", "ui", "interactive"].into_iter().collect(),
        "input" | "select" | "checkbox" | "radio" | "switch" | "slider" | "upload" => {
            ["form", "data-entry", "ui"].into_iter().collect()
        }
        "form" => ["data-entry", "validation", "ui"].into_iter().collect(),
        "table" => ["data-display", "list", "ui"].into_iter().collect(),
        "modal" | "popover" => ["overlay", "ui"].into_iter().collect(),
        "tooltip" => ["feedback", "overlay", "ui"].into_iter().collect(),
        "alert" => ["feedback", "message", "ui"].into_iter().collect(),
        "progress" | "spin" => ["feedback", "loading", "ui"].into_iter().collect(),
        "card" | "avatar" | "badge" | "tag" => ["data-display", "ui"].into_iter().collect(),
        "menu" | "breadcrumb" | "tabs" | "dropdown" => ["navigation", "ui"].into_iter().collect(),
        "pagination" => ["navigation", "data-display", "ui"].into_iter().collect(),
        _ => ["ui", "react", "component"].into_iter().collect(),
    }
    .into_iter()
    .map(String::from)
    .collect();

    tags.insert("react".to_string());
    tags.insert("component".to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_dash_separated_names() {
        assert_eq!(capitalize_component_name("button"), "Button");
        assert_eq!(capitalize_component_name("button-group"), "ButtonGroup");
        assert_eq!(capitalize_component_name("date-range-picker"), "DateRangePicker");
    }

    #[test]
    fn button_tags_include_universal_and_inferred() {
        let tags = tags_for("Button");
        for t in ["form", "action", "ui", "interactive", "react", "component"] {
            assert!(tags.contains(t), "missing tag {t}");
        }
    }

    #[test]
    fn unknown_component_falls_back_to_default_tags() {
        let tags = tags_for("Whatever");
        assert!(tags.contains("ui"));
        assert!(tags.contains("react"));
        assert!(tags.contains("component"));
    }

    #[test]
    fn extracts_description_between_separator_and_heading() {
        let doc = "---\ntitle: Button\n---\n\nA clickable button.\n\n## API\n\nstuff";
        assert_eq!(extract_description(doc), Some("title: Button A clickable button.".to_string()));
    }

    #[test]
    fn extracts_api_section_only() {
        let doc = "---\n---\ndesc\n## API\n\n| prop | type |\n|---|---|\n\n## Notes\nirrelevant";
        let api = extract_api(doc).unwrap();
        assert!(api.contains("prop"));
        assert!(!api.contains("irrelevant"));
    }

    #[test]
    fn dependency_regex_extracts_and_capitalizes_segments() {
        let content = "import { Icon } from '../icon';\nimport type { X } from '../button-group/types';";
        let caps: Vec<String> = DEP_IMPORT_RE
            .captures_iter(content)
            .map(|c| capitalize_component_name(&c[1]))
            .collect();
        assert_eq!(caps, vec!["Icon".to_string(), "ButtonGroup".to_string()]);
    }
}
