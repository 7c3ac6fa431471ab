//! Class registry: discovers class definitions and resolves inheritance.
//!
//! The registry is rebuilt from scratch on every full pass. Nothing in it is
//! mutated afterwards; the pass moves it into the published snapshot.

use indexmap::IndexMap;
use metamenu_fields::{Field, FieldType};
use tracing::{debug, warn};

use crate::config::IndexSettings;
use crate::context::IndexContext;
use crate::error::{IndexError, Result};
use crate::fileclass::{FileClass, FileClassDefinition, ID_SEPARATOR};
use crate::frontmatter::parse_frontmatter;

/// Prefix of lookup-query keys for preset fields.
pub const PRESET_QUERY_PREFIX: &str = "presetField";

/// Every class of one pass, plus the maps derived from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    /// Classes by name, in discovery order
    pub classes: IndexMap<String, FileClass>,
    /// Class name by definition path
    pub class_paths: IndexMap<String, String>,
    /// Ancestor chain by class name, nearest first
    pub ancestors: IndexMap<String, Vec<String>>,
    /// Fields of the configured global class
    pub global_fields: Vec<Field>,
    /// Class name by mapped tag (without `#`)
    pub tag_classes: IndexMap<String, String>,
    /// Lookup fields by `{class}___{field}` or `presetField___{field}`
    pub lookup_queries: IndexMap<String, Field>,
    /// Paths of classes with no version or a major version below 2
    pub legacy_v1: Vec<String>,
    /// Paths of classes with major version 2
    pub legacy_v2: Vec<String>,
}

impl Registry {
    /// Build every class from its definition.
    ///
    /// Problems that degrade the result without failing it (an unknown global
    /// class) are returned alongside.
    pub fn build(
        definitions: &IndexMap<String, FileClassDefinition>,
        settings: &IndexSettings,
    ) -> (Self, Vec<IndexError>) {
        let mut issues = Vec::new();
        let ancestors = compute_ancestors(definitions);

        let global_fields = match global_class_fields(definitions, &ancestors, settings) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(%e, "global class unavailable");
                issues.push(e);
                Vec::new()
            }
        };

        let mut registry = Registry {
            ancestors,
            global_fields,
            ..Default::default()
        };

        for (name, definition) in definitions {
            let class = class_fields(definitions, &registry.ancestors, definition);
            for tag in &class.mapped_tags {
                if let Some(previous) = registry.tag_classes.insert(tag.clone(), name.clone()) {
                    if &previous != name {
                        debug!(%tag, %previous, class = %name, "tag remapped");
                    }
                }
            }
            match class.major_version {
                None => registry.legacy_v1.push(class.path.clone()),
                Some(v) if v < 2 => registry.legacy_v1.push(class.path.clone()),
                Some(2) => registry.legacy_v2.push(class.path.clone()),
                Some(_) => {}
            }
            registry
                .class_paths
                .insert(class.path.clone(), name.clone());
            registry.classes.insert(name.clone(), class);
        }

        registry.lookup_queries = lookup_queries(&registry.classes, &settings.preset_fields);

        debug!(
            classes = registry.classes.len(),
            tags = registry.tag_classes.len(),
            lookups = registry.lookup_queries.len(),
            legacy_v1 = registry.legacy_v1.len(),
            legacy_v2 = registry.legacy_v2.len(),
            "class registry built"
        );
        (registry, issues)
    }

    /// Effective fields of a class, empty for unknown names.
    pub fn fields_for_class(&self, name: &str) -> &[Field] {
        self.classes
            .get(name)
            .map(|c| c.fields.as_slice())
            .unwrap_or(&[])
    }
}

/// Read and parse every class definition document.
///
/// A definition that fails to read or parse is logged, reported and left
/// out; the others are unaffected.
pub async fn load_definitions(
    ctx: &IndexContext,
    documents: &[String],
) -> (IndexMap<String, FileClassDefinition>, Vec<IndexError>) {
    let mut definitions = IndexMap::new();
    let mut issues = Vec::new();

    for path in documents {
        let Some(name) = ctx.settings.class_name_for(path) else {
            continue;
        };
        match load_definition(ctx, &name, path).await {
            Ok(definition) => {
                definitions.insert(name, definition);
            }
            Err(e) => {
                warn!(%path, %e, "skipping class definition");
                issues.push(e);
            }
        }
    }
    (definitions, issues)
}

async fn load_definition(
    ctx: &IndexContext,
    name: &str,
    path: &str,
) -> Result<FileClassDefinition> {
    let content = ctx.store.read(path).await?;
    let parsed =
        parse_frontmatter(&content).map_err(|e| IndexError::malformed(path, e.to_string()))?;
    FileClassDefinition::parse(name, path, parsed.metadata.as_ref(), &parsed.content)
}

/// Ancestor chain of every class, nearest first.
///
/// A parent counts only if its definition exists. The walk stops at a class
/// without parent, or when the next parent is the class itself or already in
/// the chain, so cyclic `extends` graphs terminate.
pub fn compute_ancestors(
    definitions: &IndexMap<String, FileClassDefinition>,
) -> IndexMap<String, Vec<String>> {
    definitions
        .keys()
        .map(|name| {
            let mut chain: Vec<String> = Vec::new();
            let mut current = name.as_str();
            while let Some(parent) = parent_of(definitions, current) {
                if parent == name || chain.iter().any(|a| a == parent) {
                    break;
                }
                chain.push(parent.to_string());
                current = parent;
            }
            (name.clone(), chain)
        })
        .collect()
}

fn parent_of<'a>(
    definitions: &'a IndexMap<String, FileClassDefinition>,
    name: &str,
) -> Option<&'a str> {
    definitions
        .get(name)?
        .extends
        .as_deref()
        .filter(|parent| definitions.contains_key(*parent))
}

fn class_fields(
    definitions: &IndexMap<String, FileClassDefinition>,
    ancestors: &IndexMap<String, Vec<String>>,
    definition: &FileClassDefinition,
) -> FileClass {
    let chain = ancestors.get(&definition.name).cloned().unwrap_or_default();
    let inherited: Vec<&[Field]> = chain
        .iter()
        .filter_map(|a| definitions.get(a))
        .map(|d| d.fields.as_slice())
        .collect();
    FileClass::build(definition, chain, inherited)
}

fn global_class_fields(
    definitions: &IndexMap<String, FileClassDefinition>,
    ancestors: &IndexMap<String, Vec<String>>,
    settings: &IndexSettings,
) -> Result<Vec<Field>> {
    let Some(name) = settings
        .global_file_class
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    else {
        return Ok(Vec::new());
    };
    let definition = definitions
        .get(name)
        .ok_or_else(|| IndexError::unresolved("settings.globalFileClass", name))?;
    Ok(class_fields(definitions, ancestors, definition).fields)
}

/// Lookup fields keyed for the host's dependency resolution.
pub fn lookup_queries(
    classes: &IndexMap<String, FileClass>,
    presets: &[Field],
) -> IndexMap<String, Field> {
    let mut queries = IndexMap::new();
    for field in presets.iter().filter(|f| f.type_ == FieldType::Lookup) {
        queries.insert(
            format!("{PRESET_QUERY_PREFIX}{ID_SEPARATOR}{}", field.name),
            field.clone(),
        );
    }
    for (name, class) in classes {
        for field in class.lookup_fields() {
            queries.insert(format!("{name}{ID_SEPARATOR}{}", field.name), field.clone());
        }
    }
    queries
}
