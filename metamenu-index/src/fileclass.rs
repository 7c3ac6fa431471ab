//! Class definition documents.
//!
//! A class definition is a markdown document in the class folder. Its
//! frontmatter declares the class fields and options:
//!
//! ```yaml
//! ---
//! extends: Media
//! version: "2.1"
//! mapWithTag: true
//! tagNames: [book, novel]
//! excludes: [Duration]
//! fields:
//!   - name: Author
//!     id: a7thor
//!     type: Input
//!     options: {}
//! ---
//! ```
//!
//! Definitions without a `fields` list use the legacy body format, one
//! `Name:: {"type": "...", "options": {...}}` line per field.

use std::collections::BTreeSet;

use metamenu_fields::{Field, FieldType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{IndexError, Result};
use crate::frontmatter::inline_field_lines;

/// Separator of synthetic field ids, `{class}___{field}`.
pub const ID_SEPARATOR: &str = "___";

/// A class definition as written, before inheritance.
#[derive(Debug, Clone, PartialEq)]
pub struct FileClassDefinition {
    pub name: String,
    pub path: String,
    /// Own fields in declaration order
    pub fields: Vec<Field>,
    /// Name of the parent class
    pub extends: Option<String>,
    pub major_version: Option<u32>,
    pub map_with_tag: bool,
    pub tag_names: Vec<String>,
    /// Field names or ids removed from the effective field list
    pub excludes: Vec<String>,
    /// Number of field entries that could not be parsed
    pub skipped_fields: usize,
}

impl FileClassDefinition {
    /// Parse a class definition from its frontmatter and body.
    ///
    /// Malformed field entries are logged and skipped. A `fields` value that
    /// is not a list makes the whole definition malformed.
    pub fn parse(
        name: &str,
        path: &str,
        frontmatter: Option<&Map<String, Value>>,
        body: &str,
    ) -> Result<Self> {
        let empty = Map::new();
        let frontmatter = frontmatter.unwrap_or(&empty);

        let mut skipped_fields = 0;
        let mut fields = match frontmatter.get("fields") {
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| match Field::from_value(entry) {
                    Ok(field) => Some(field),
                    Err(e) => {
                        warn!(%path, index = i, %e, "skipping malformed field");
                        skipped_fields += 1;
                        None
                    }
                })
                .collect(),
            None | Some(Value::Null) => legacy_fields(path, body, &mut skipped_fields),
            Some(other) => {
                return Err(IndexError::malformed(
                    path,
                    format!("fields must be a list, found {other}"),
                ))
            }
        };

        for field in &mut fields {
            if field.id.trim().is_empty() {
                field.id = format!("{name}{ID_SEPARATOR}{}", field.name);
            }
            field.file_class_name = Some(name.to_string());
        }

        let definition = Self {
            name: name.to_string(),
            path: path.to_string(),
            fields,
            extends: frontmatter
                .get("extends")
                .and_then(Value::as_str)
                .map(|s| s.trim().trim_start_matches("[[").trim_end_matches("]]").to_string())
                .filter(|s| !s.is_empty()),
            major_version: frontmatter.get("version").and_then(parse_major_version),
            map_with_tag: frontmatter.get("mapWithTag").is_some_and(truthy),
            tag_names: frontmatter
                .get("tagNames")
                .map(string_list)
                .unwrap_or_default(),
            excludes: frontmatter
                .get("excludes")
                .map(string_list)
                .unwrap_or_default(),
            skipped_fields,
        };
        debug!(
            class = %definition.name,
            fields = definition.fields.len(),
            skipped = skipped_fields,
            "parsed class definition"
        );
        Ok(definition)
    }

    /// Tags mapped to this class. Names containing spaces are ignored.
    pub fn mapped_tags(&self) -> Vec<String> {
        if !self.map_with_tag {
            return Vec::new();
        }
        let candidates = if self.tag_names.is_empty() {
            vec![self.name.clone()]
        } else {
            self.tag_names.clone()
        };
        candidates
            .into_iter()
            .map(|t| t.trim().trim_start_matches('#').to_string())
            .filter(|t| !t.is_empty() && !t.contains(' '))
            .collect()
    }
}

/// A class with inheritance applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileClass {
    pub name: String,
    pub path: String,
    /// Own fields, then inherited fields not shadowed by name, minus excludes
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_version: Option<u32>,
    /// Nearest first
    pub ancestors: Vec<String>,
    pub excluded_field_ids: BTreeSet<String>,
    pub mapped_tags: Vec<String>,
}

impl FileClass {
    /// Apply inheritance. `ancestor_fields` yields each ancestor's own fields,
    /// nearest first.
    pub fn build<'a>(
        definition: &FileClassDefinition,
        ancestors: Vec<String>,
        ancestor_fields: impl IntoIterator<Item = &'a [Field]>,
    ) -> Self {
        let mut candidates: Vec<Field> = definition.fields.clone();
        for fields in ancestor_fields {
            for field in fields {
                if !candidates.iter().any(|f| f.name == field.name) {
                    candidates.push(field.clone());
                }
            }
        }

        let is_excluded = |f: &Field| {
            definition
                .excludes
                .iter()
                .any(|e| e == &f.name || e == &f.id)
        };
        let excluded_field_ids = candidates
            .iter()
            .filter(|f| is_excluded(f))
            .map(|f| f.id.clone())
            .collect();
        candidates.retain(|f| !is_excluded(f));

        Self {
            name: definition.name.clone(),
            path: definition.path.clone(),
            fields: candidates,
            major_version: definition.major_version,
            ancestors,
            excluded_field_ids,
            mapped_tags: definition.mapped_tags(),
        }
    }

    /// Canvas paths targeted by this class's `Canvas` fields.
    pub fn canvas_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for field in self.fields.iter().filter(|f| f.type_ == FieldType::Canvas) {
            if let Some(path) = field.option_str("canvasPath") {
                if !paths.iter().any(|p| p == path) {
                    paths.push(path.to_string());
                }
            }
        }
        paths
    }

    /// Lookup fields only.
    pub fn lookup_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.type_ == FieldType::Lookup)
    }
}

fn legacy_fields(path: &str, body: &str, skipped: &mut usize) -> Vec<Field> {
    inline_field_lines(body)
        .into_iter()
        .filter_map(|(name, raw)| {
            let mut entry = if raw.is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&raw) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) | Err(_) => {
                        warn!(%path, field = %name, "skipping legacy field with unreadable settings");
                        *skipped += 1;
                        return None;
                    }
                }
            };
            entry.insert("name".into(), Value::String(name.clone()));
            entry.entry("id").or_insert_with(|| Value::String(String::new()));
            match Field::from_value(&Value::Object(entry)) {
                Ok(field) => Some(field),
                Err(e) => {
                    warn!(%path, field = %name, %e, "skipping malformed legacy field");
                    *skipped += 1;
                    None
                }
            }
        })
        .collect()
}

/// `2`, `2.1`, `"2.1"` all give major version 2.
fn parse_major_version(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().split('.').next()?.trim().parse().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A list of strings, or one comma separated string.
fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frontmatter(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_fields_and_options() {
        let fm = frontmatter(json!({
            "extends": "Media",
            "version": "2.1",
            "mapWithTag": true,
            "tagNames": "book, novel, bad tag",
            "excludes": ["Duration"],
            "fields": [
                {"name": "Author", "id": "a7thor", "type": "Input"},
                {"name": "Cover", "type": "Media"},
                {"id": "noname", "type": "Input"},
                {"name": "", "id": "empty0"}
            ]
        }));
        let def = FileClassDefinition::parse("Book", "Classes/Book.md", Some(&fm), "").unwrap();
        assert_eq!(def.extends.as_deref(), Some("Media"));
        assert_eq!(def.major_version, Some(2));
        assert_eq!(def.skipped_fields, 2);
        assert_eq!(def.fields.len(), 2);
        assert_eq!(def.fields[1].id, "Book___Cover");
        assert!(def.fields.iter().all(|f| f.file_class_name.as_deref() == Some("Book")));
        assert_eq!(def.mapped_tags(), vec!["book", "novel"]);
        assert_eq!(def.excludes, vec!["Duration"]);
    }

    #[test]
    fn fields_must_be_a_list() {
        let fm = frontmatter(json!({"fields": "Author"}));
        let err = FileClassDefinition::parse("Book", "Classes/Book.md", Some(&fm), "").unwrap_err();
        assert!(matches!(err, IndexError::MalformedDefinition { .. }));
    }

    #[test]
    fn legacy_body_fields() {
        let body = "Title:: \nStatus:: {\"type\": \"Select\", \"options\": {\"0\": \"todo\"}}\nBroken:: {not json\n";
        let def = FileClassDefinition::parse("Task", "Classes/Task.md", None, body).unwrap();
        assert_eq!(def.major_version, None);
        assert_eq!(def.skipped_fields, 1);
        let names: Vec<_> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Title", "Status"]);
        assert_eq!(def.fields[1].type_, FieldType::Select);
        assert_eq!(def.fields[0].id, "Task___Title");
    }

    #[test]
    fn implicit_tag_is_class_name() {
        let fm = frontmatter(json!({"mapWithTag": "true"}));
        let def = FileClassDefinition::parse("Book", "p", Some(&fm), "").unwrap();
        assert_eq!(def.mapped_tags(), vec!["Book"]);

        let spaced = FileClassDefinition::parse("Reading List", "p", Some(&fm), "").unwrap();
        assert!(spaced.mapped_tags().is_empty());
    }

    #[test]
    fn version_parsing() {
        assert_eq!(parse_major_version(&json!(3)), Some(3));
        assert_eq!(parse_major_version(&json!(2.5)), Some(2));
        assert_eq!(parse_major_version(&json!("1")), Some(1));
        assert_eq!(parse_major_version(&json!("x")), None);
        assert_eq!(parse_major_version(&json!(null)), None);
    }

    #[test]
    fn inheritance_and_exclusion() {
        let media = FileClassDefinition::parse(
            "Media",
            "Classes/Media.md",
            Some(&frontmatter(json!({"fields": [
                {"name": "Title", "id": "mtitle"},
                {"name": "Duration", "id": "durati"},
                {"name": "Rating", "id": "rating", "type": "Number"}
            ]}))),
            "",
        )
        .unwrap();
        let book = FileClassDefinition::parse(
            "Book",
            "Classes/Book.md",
            Some(&frontmatter(json!({
                "extends": "Media",
                "excludes": "Duration",
                "fields": [{"name": "Title", "id": "btitle"}, {"name": "Pages", "id": "pages0"}]
            }))),
            "",
        )
        .unwrap();

        let class = FileClass::build(&book, vec!["Media".into()], [media.fields.as_slice()]);
        let ids: Vec<_> = class.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["btitle", "pages0", "rating"]);
        assert!(class.excluded_field_ids.contains("durati"));
        assert_eq!(class.fields[2].file_class_name.as_deref(), Some("Media"));
    }

    #[test]
    fn canvas_paths_are_unique() {
        let fm = frontmatter(json!({"fields": [
            {"name": "a", "type": "Canvas", "options": {"canvasPath": "board.canvas"}},
            {"name": "b", "type": "Canvas", "options": {"canvasPath": "board.canvas"}},
            {"name": "g", "type": "CanvasGroup", "options": {"canvasPath": "groups.canvas"}},
            {"name": "c", "type": "Input", "options": {"canvasPath": "other.canvas"}}
        ]}));
        let def = FileClassDefinition::parse("Board", "p", Some(&fm), "").unwrap();
        let class = FileClass::build(&def, Vec::new(), std::iter::empty());
        assert_eq!(class.canvas_paths(), vec!["board.canvas"]);
    }
}
