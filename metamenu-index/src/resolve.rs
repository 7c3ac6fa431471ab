//! Field resolution: one authoritative field list per document.
//!
//! Sources by priority:
//!
//! 1. Inner class, tag and query contributions. If any is non-empty they are
//!    merged in that order, deduplicated by id, first seen wins.
//! 2. The global class, if it has fields.
//! 3. The preset fields, copied per document.

use indexmap::IndexMap;
use metamenu_fields::Field;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IndexSettings;
use crate::matchers::Contributions;
use crate::snapshot::DocumentFields;

/// Which branch produced a document's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSource {
    Merged,
    GlobalFileClass,
    #[default]
    Presets,
}

/// Resolved fields of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub source: ResolutionSource,
    pub fields: Vec<Field>,
    /// Lookup and formula fields, from the resolved fields and from any tag
    /// or query contribution
    pub lookup_and_formula: Vec<Field>,
}

fn push_missing(target: &mut Vec<Field>, candidates: &[Field], keep: impl Fn(&Field) -> bool) {
    for field in candidates {
        if keep(field) && !target.iter().any(|f| f.id == field.id) {
            target.push(field.clone());
        }
    }
}

/// Resolve the fields of one document from its contributions.
pub fn resolve_fields(
    inner: &[Field],
    tags: &[Field],
    queries: &[Field],
    global: &[Field],
    presets: &[Field],
) -> Resolution {
    let (source, fields) = if !inner.is_empty() || !tags.is_empty() || !queries.is_empty() {
        let mut fields = inner.to_vec();
        push_missing(&mut fields, tags, |_| true);
        push_missing(&mut fields, queries, |_| true);
        (ResolutionSource::Merged, fields)
    } else if !global.is_empty() {
        (ResolutionSource::GlobalFileClass, global.to_vec())
    } else {
        (ResolutionSource::Presets, presets.to_vec())
    };

    let mut lookup_and_formula: Vec<Field> =
        fields.iter().filter(|f| f.is_computed()).cloned().collect();
    if source == ResolutionSource::Merged {
        push_missing(&mut lookup_and_formula, tags, Field::is_computed);
        push_missing(&mut lookup_and_formula, queries, Field::is_computed);
    }

    Resolution {
        source,
        fields,
        lookup_and_formula,
    }
}

/// Resolve every non-class document of the corpus.
pub fn resolve_documents(
    settings: &IndexSettings,
    global_fields: &[Field],
    documents: &[String],
    mut contributions: Contributions,
) -> IndexMap<String, DocumentFields> {
    let global_class = settings.global_file_class.clone();
    let mut resolved = IndexMap::new();

    for path in documents {
        if settings.is_class_document(path) {
            continue;
        }
        let from_inner = contributions.from_inner.shift_remove(path).unwrap_or_default();
        let from_tags = contributions.from_tags.shift_remove(path).unwrap_or_default();
        let from_queries = contributions.from_queries.shift_remove(path).unwrap_or_default();
        let resolution = resolve_fields(
            &from_inner,
            &from_tags,
            &from_queries,
            global_fields,
            &settings.preset_fields,
        );

        let mut classes = contributions.classes.shift_remove(path).unwrap_or_default();
        if resolution.source == ResolutionSource::GlobalFileClass {
            classes = global_class.iter().cloned().collect();
        }

        resolved.insert(
            path.clone(),
            DocumentFields {
                from_inner,
                from_tags,
                from_queries,
                resolved: resolution.fields,
                lookup_and_formula: resolution.lookup_and_formula,
                source: resolution.source,
                classes,
            },
        );
    }
    debug!(documents = resolved.len(), "document fields resolved");
    resolved
}
