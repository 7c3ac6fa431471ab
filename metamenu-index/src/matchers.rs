//! Per-document field contributions from tags, queries and inner class references.

use indexmap::IndexMap;
use metamenu_fields::Field;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::IndexContext;
use crate::error::IndexError;
use crate::fileclass::FileClass;
use crate::query::tag_disjunction;
use crate::registry::Registry;
use crate::tags::same_tag;

/// Fields each source contributes, by document path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contributions {
    pub from_inner: IndexMap<String, Vec<Field>>,
    pub from_tags: IndexMap<String, Vec<Field>>,
    pub from_queries: IndexMap<String, Vec<Field>>,
    /// Class names associated with each document, first association first
    pub classes: IndexMap<String, Vec<String>>,
}

impl Contributions {
    fn associate(&mut self, path: &str, class: &str) {
        let classes = self.classes.entry(path.to_string()).or_default();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }
}

/// The newest class's fields first, then earlier fields that are neither
/// duplicated by id nor excluded by the newest class.
fn merge_with_previous(class: &FileClass, previous: Option<&Vec<Field>>) -> Vec<Field> {
    let mut fields = class.fields.clone();
    if let Some(previous) = previous {
        let kept: Vec<Field> = previous
            .iter()
            .filter(|f| {
                !class.fields.iter().any(|n| n.id == f.id)
                    && !class.excluded_field_ids.contains(&f.id)
            })
            .cloned()
            .collect();
        fields.extend(kept);
    }
    fields
}

/// Class mapped to a document tag. An exact mapping wins over one that
/// differs only in case.
fn class_for_tag<'a>(registry: &'a Registry, tag: &str) -> Option<&'a String> {
    registry
        .tag_classes
        .get(tag.trim_start_matches('#'))
        .or_else(|| {
            registry
                .tag_classes
                .iter()
                .find(|(mapped, _)| same_tag(mapped, tag))
                .map(|(_, class)| class)
        })
}

/// Attach the classes mapped to each tag a document carries.
///
/// All mapped tags are fetched with a single `#a or #b` query. If that query
/// fails no tag contributions are made and the error is returned.
pub async fn match_tags(
    ctx: &IndexContext,
    registry: &Registry,
    contributions: &mut Contributions,
) -> Vec<IndexError> {
    if registry.tag_classes.is_empty() {
        return Vec::new();
    }
    let query = tag_disjunction(registry.tag_classes.keys().map(String::as_str));
    let pages = match ctx.engine.pages(&query).await {
        Ok(pages) => pages,
        Err(e) => {
            warn!(%query, %e, "tag query failed");
            return vec![e];
        }
    };

    for page in pages {
        for tag in &page.tags {
            let Some(class_name) = class_for_tag(registry, tag) else {
                continue;
            };
            let Some(class) = registry.classes.get(class_name) else {
                continue;
            };
            contributions.associate(&page.path, &class.name);
            let fields = merge_with_previous(class, contributions.from_tags.get(&page.path));
            contributions.from_tags.insert(page.path.clone(), fields);
        }
    }
    debug!(documents = contributions.from_tags.len(), "tag matches resolved");
    Vec::new()
}

/// Attach the class of every configured query to its matching documents.
///
/// The last query matching a document wins: its class's fields replace any
/// earlier query contribution. A failing query is skipped.
pub async fn match_queries(
    ctx: &IndexContext,
    registry: &Registry,
    contributions: &mut Contributions,
) -> Vec<IndexError> {
    let mut issues = Vec::new();
    for file_class_query in &ctx.settings.file_class_queries {
        let Some(class) = registry.classes.get(&file_class_query.file_class_name) else {
            warn!(
                query = %file_class_query.name,
                class = %file_class_query.file_class_name,
                "query targets an unknown class"
            );
            issues.push(IndexError::unresolved(
                format!("fileClassQuery {}", file_class_query.name),
                &file_class_query.file_class_name,
            ));
            continue;
        };
        let pages = match ctx.engine.pages(&file_class_query.query).await {
            Ok(pages) => pages,
            Err(e) => {
                warn!(query = %file_class_query.name, %e, "skipping class query");
                issues.push(e);
                continue;
            }
        };
        for page in pages {
            contributions.associate(&page.path, &class.name);
            contributions
                .from_queries
                .insert(page.path, class.fields.clone());
        }
    }
    debug!(documents = contributions.from_queries.len(), "query matches resolved");
    issues
}

/// Class names a document declares under the class alias key, as a list
/// or a comma separated string.
pub fn inner_class_names(value: &Value) -> Vec<String> {
    let names: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Attach the classes each document names in its own frontmatter.
///
/// Class definition documents are skipped. Every other document gets an
/// entry, empty when it names no known class. An unknown class name is
/// reported and drops the fields merged so far; classes named after it still
/// contribute.
pub async fn match_inner(
    ctx: &IndexContext,
    registry: &Registry,
    documents: &[String],
    contributions: &mut Contributions,
) -> Vec<IndexError> {
    let mut issues = Vec::new();
    let alias = ctx.settings.file_class_alias.as_str();

    for path in documents {
        if ctx.settings.is_class_document(path) {
            continue;
        }
        contributions.from_inner.entry(path.clone()).or_default();

        let names = ctx
            .store
            .cache(path)
            .await
            .and_then(|cache| cache.frontmatter)
            .and_then(|fm| fm.get(alias).map(inner_class_names))
            .unwrap_or_default();

        for name in names {
            let Some(class) = registry.classes.get(&name) else {
                debug!(%path, class = %name, "document names an unknown class");
                issues.push(IndexError::unresolved(path, name));
                contributions.from_inner.insert(path.clone(), Vec::new());
                continue;
            };
            contributions.associate(path, &class.name);
            let fields = merge_with_previous(class, contributions.from_inner.get(path));
            contributions.from_inner.insert(path.clone(), fields);
        }
    }
    issues
}
