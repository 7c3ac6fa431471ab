//! Immutable result of one full index pass.

use indexmap::IndexMap;
use metamenu_fields::Field;
use serde::Serialize;

use crate::fileclass::FileClass;
use crate::registry::Registry;
use crate::resolve::ResolutionSource;

/// Fields of one document, with the contribution of every source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    pub from_inner: Vec<Field>,
    pub from_tags: Vec<Field>,
    pub from_queries: Vec<Field>,
    pub resolved: Vec<Field>,
    pub lookup_and_formula: Vec<Field>,
    pub source: ResolutionSource,
    /// Classes the document belongs to
    pub classes: Vec<String>,
}

/// Everything a full pass computed, published as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    pub generation: u64,
    pub classes: IndexMap<String, FileClass>,
    pub class_paths: IndexMap<String, String>,
    pub ancestors: IndexMap<String, Vec<String>>,
    pub global_fields: Vec<Field>,
    pub tag_classes: IndexMap<String, String>,
    pub lookup_queries: IndexMap<String, Field>,
    pub legacy_v1: Vec<String>,
    pub legacy_v2: Vec<String>,
    pub documents: IndexMap<String, DocumentFields>,
    /// Linked files by canvas path
    pub canvas_files: IndexMap<String, Vec<String>>,
    /// Option values by values note path
    pub values_lists: IndexMap<String, Vec<String>>,
}

impl IndexSnapshot {
    pub fn new(
        generation: u64,
        registry: Registry,
        documents: IndexMap<String, DocumentFields>,
        canvas_files: IndexMap<String, Vec<String>>,
        values_lists: IndexMap<String, Vec<String>>,
    ) -> Self {
        Self {
            generation,
            classes: registry.classes,
            class_paths: registry.class_paths,
            ancestors: registry.ancestors,
            global_fields: registry.global_fields,
            tag_classes: registry.tag_classes,
            lookup_queries: registry.lookup_queries,
            legacy_v1: registry.legacy_v1,
            legacy_v2: registry.legacy_v2,
            documents,
            canvas_files,
            values_lists,
        }
    }

    /// Resolved fields of a document.
    pub fn fields_for(&self, path: &str) -> &[Field] {
        self.documents
            .get(path)
            .map(|d| d.resolved.as_slice())
            .unwrap_or(&[])
    }

    /// Lookup and formula fields of a document.
    pub fn lookup_and_formula_for(&self, path: &str) -> &[Field] {
        self.documents
            .get(path)
            .map(|d| d.lookup_and_formula.as_slice())
            .unwrap_or(&[])
    }

    /// Classes a document belongs to.
    pub fn classes_for(&self, path: &str) -> &[String] {
        self.documents
            .get(path)
            .map(|d| d.classes.as_slice())
            .unwrap_or(&[])
    }

    pub fn class(&self, name: &str) -> Option<&FileClass> {
        self.classes.get(name)
    }

    /// Class defined by the document at `path`.
    pub fn class_by_path(&self, path: &str) -> Option<&FileClass> {
        self.class_paths
            .get(path)
            .and_then(|name| self.classes.get(name))
    }

    /// Effective fields of a class.
    pub fn fields_for_class(&self, name: &str) -> &[Field] {
        self.classes
            .get(name)
            .map(|c| c.fields.as_slice())
            .unwrap_or(&[])
    }

    /// Documents with at least one lookup or formula field.
    pub fn computed_documents(&self) -> impl Iterator<Item = (&String, &[Field])> {
        self.documents
            .iter()
            .filter(|(_, d)| !d.lookup_and_formula.is_empty())
            .map(|(path, d)| (path, d.lookup_and_formula.as_slice()))
    }

    /// Every field id in use by a class or the given presets.
    pub fn field_ids<'a>(&'a self, presets: &'a [Field]) -> impl Iterator<Item = &'a str> {
        self.classes
            .values()
            .flat_map(|c| c.fields.iter())
            .chain(presets.iter())
            .map(|f| f.id.as_str())
    }
}
