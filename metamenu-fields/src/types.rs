//! Core field types.
//!
//! A [`Field`] is one named, typed metadata attribute. Fields are declared in
//! class definition documents (as a `fields:` list in frontmatter) or in the
//! preset list of the settings, and serialize to/from the same shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FieldsError, Result};

/// Type-specific options of a field, kept as raw JSON.
pub type Options = Map<String, Value>;

/// Separator between ids in a legacy indexed `path` value.
const PATH_SEPARATOR: &str = "____";

/// The type of a field. Decides how a value is edited, displayed and computed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FieldType {
    Input,
    Number,
    Boolean,
    Select,
    Cycle,
    Multi,
    File,
    MultiFile,
    Media,
    MultiMedia,
    Date,
    DateTime,
    Time,
    Lookup,
    Formula,
    Canvas,
    CanvasGroup,
    CanvasGroupLink,
    #[serde(rename = "YAML")]
    Yaml,
    #[serde(rename = "JSON")]
    Json,
    Object,
    ObjectList,
}

impl FieldType {
    /// Every field type, in declaration order.
    pub const ALL: [FieldType; 22] = [
        FieldType::Input,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Select,
        FieldType::Cycle,
        FieldType::Multi,
        FieldType::File,
        FieldType::MultiFile,
        FieldType::Media,
        FieldType::MultiMedia,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Time,
        FieldType::Lookup,
        FieldType::Formula,
        FieldType::Canvas,
        FieldType::CanvasGroup,
        FieldType::CanvasGroupLink,
        FieldType::Yaml,
        FieldType::Json,
        FieldType::Object,
        FieldType::ObjectList,
    ];

    /// Name as written in definition documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Input => "Input",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Select => "Select",
            FieldType::Cycle => "Cycle",
            FieldType::Multi => "Multi",
            FieldType::File => "File",
            FieldType::MultiFile => "MultiFile",
            FieldType::Media => "Media",
            FieldType::MultiMedia => "MultiMedia",
            FieldType::Date => "Date",
            FieldType::DateTime => "DateTime",
            FieldType::Time => "Time",
            FieldType::Lookup => "Lookup",
            FieldType::Formula => "Formula",
            FieldType::Canvas => "Canvas",
            FieldType::CanvasGroup => "CanvasGroup",
            FieldType::CanvasGroupLink => "CanvasGroupLink",
            FieldType::Yaml => "YAML",
            FieldType::Json => "JSON",
            FieldType::Object => "Object",
            FieldType::ObjectList => "ObjectList",
        }
    }

    /// Value is computed by an external engine (lookup or formula).
    pub fn is_computed(&self) -> bool {
        matches!(self, FieldType::Lookup | FieldType::Formula)
    }

    /// Value is a list that may be displayed as an array or as a list.
    pub fn is_multi(&self) -> bool {
        match self {
            FieldType::Multi
            | FieldType::MultiFile
            | FieldType::MultiMedia
            | FieldType::Canvas
            | FieldType::CanvasGroup
            | FieldType::CanvasGroupLink => true,
            FieldType::Input
            | FieldType::Number
            | FieldType::Boolean
            | FieldType::Select
            | FieldType::Cycle
            | FieldType::File
            | FieldType::Media
            | FieldType::Date
            | FieldType::DateTime
            | FieldType::Time
            | FieldType::Lookup
            | FieldType::Formula
            | FieldType::Yaml
            | FieldType::Json
            | FieldType::Object
            | FieldType::ObjectList => false,
        }
    }

    /// Field must sit at the root of its scope and can never have a parent.
    pub fn is_root_only(&self) -> bool {
        matches!(
            self,
            FieldType::Canvas
                | FieldType::CanvasGroup
                | FieldType::CanvasGroupLink
                | FieldType::Lookup
                | FieldType::Formula
        )
    }

    /// Value can only live in frontmatter, not as an inline field.
    pub fn is_frontmatter_only(&self) -> bool {
        matches!(
            self,
            FieldType::Yaml | FieldType::Json | FieldType::Object | FieldType::ObjectList
        )
    }

    /// Field can be the parent of other fields.
    pub fn is_nestable_parent(&self) -> bool {
        matches!(self, FieldType::Object | FieldType::ObjectList)
    }

    /// Field derives its value from a canvas document.
    pub fn is_canvas(&self) -> bool {
        matches!(
            self,
            FieldType::Canvas | FieldType::CanvasGroup | FieldType::CanvasGroupLink
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = FieldsError;

    fn from_str(s: &str) -> Result<Self> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FieldsError::malformed(format!("unknown field type '{s}'")))
    }
}

/// How a multi-valued field is written in frontmatter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MultiDisplay {
    #[default]
    AsArray,
    AsList,
}

/// Inline rendering decorations for a field value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FieldStyle {
    Bold,
    Italic,
    Code,
    Strikethrough,
}

/// Palette command bound to a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldCommand {
    pub id: String,
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<String>,
}

/// A field definition: the complete schema for a single named attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "FieldRecord")]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub options: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<MultiDisplay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BTreeMap<FieldStyle, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<FieldCommand>,
}

/// On-disk shape of a field. Older definitions carry an indexed `path`
/// (`"rootId____childId"`) instead of `parent`; the last segment is the parent.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldRecord {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(rename = "type", default = "default_type")]
    type_: FieldType,
    #[serde(default)]
    options: Options,
    #[serde(default)]
    file_class_name: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    display: Option<MultiDisplay>,
    #[serde(default)]
    style: Option<BTreeMap<FieldStyle, bool>>,
    #[serde(default)]
    command: Option<FieldCommand>,
}

fn default_type() -> FieldType {
    FieldType::Input
}

impl From<FieldRecord> for Field {
    fn from(record: FieldRecord) -> Self {
        let parent = record
            .parent
            .filter(|p| !p.is_empty())
            .or_else(|| {
                record
                    .path
                    .as_deref()
                    .and_then(|p| p.rsplit(PATH_SEPARATOR).next())
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
            });
        Field {
            id: record.id,
            name: record.name,
            type_: record.type_,
            options: record.options,
            file_class_name: record.file_class_name,
            parent,
            display: record.display,
            style: record.style,
            command: record.command,
        }
    }
}

impl Field {
    /// A plain `Input` field with the given name and no id yet.
    pub fn create_default(name: impl Into<String>) -> Self {
        Field {
            id: String::new(),
            name: name.into(),
            type_: FieldType::Input,
            options: Options::new(),
            file_class_name: None,
            parent: None,
            display: None,
            style: None,
            command: None,
        }
    }

    /// Parse a field from a JSON value (a frontmatter `fields:` entry).
    pub fn from_value(value: &Value) -> Result<Self> {
        let field: Field = serde_json::from_value(value.clone())?;
        if field.name.trim().is_empty() {
            return Err(FieldsError::EmptyName { id: field.id });
        }
        Ok(field)
    }

    /// Copy every property of `source` into `self`. Options are replaced
    /// wholesale, so keys missing from `source` disappear.
    pub fn copy_from(&mut self, source: &Field) {
        self.id = source.id.clone();
        self.name = source.name.clone();
        self.type_ = source.type_;
        self.options = source.options.clone();
        self.command = source.command.clone();
        self.display = source.display;
        self.style = source.style.clone();
        self.parent = source.parent.clone();
    }

    /// Lookup or formula field.
    pub fn is_computed(&self) -> bool {
        self.type_.is_computed()
    }

    /// Read a string option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Resolve how the value is written: multi-valued types use their own
    /// display or the configured default, everything else is an array.
    pub fn effective_display(&self, default: MultiDisplay) -> MultiDisplay {
        if self.type_.is_multi() {
            self.display.unwrap_or(default)
        } else {
            MultiDisplay::AsArray
        }
    }

    /// Check the field against the other fields of its scope.
    pub fn validate(&self, scope: &[Field]) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FieldsError::EmptyName {
                id: self.id.clone(),
            });
        }
        let Some(parent) = self.parent.as_deref() else {
            return Ok(());
        };
        if self.type_.is_root_only() {
            return Err(FieldsError::RootOnlyType {
                name: self.name.clone(),
                field_type: self.type_.to_string(),
            });
        }
        if crate::tree::get_parent_candidate(scope, parent).is_none() {
            return Err(FieldsError::ParentNotFound {
                id: parent.to_string(),
            });
        }
        if parent == self.id || crate::tree::has_itself_as_ancestor(scope, parent, &self.id) {
            return Err(FieldsError::ParentCycle {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_field(id: &str, name: &str, type_: FieldType) -> Field {
        Field {
            id: id.into(),
            ..Field::create_default(name)
        }
        .with_type(type_)
    }

    impl Field {
        fn with_type(mut self, type_: FieldType) -> Self {
            self.type_ = type_;
            self
        }
    }

    #[test]
    fn field_type_names_match_definition_documents() {
        for t in FieldType::ALL {
            let yaml = serde_yaml_ng::to_string(&t).unwrap();
            assert_eq!(yaml.trim(), t.as_str());
            assert_eq!(t.as_str().parse::<FieldType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        assert!("Spreadsheet".parse::<FieldType>().is_err());
        assert!(serde_json::from_value::<Field>(json!({
            "name": "x",
            "id": "aaaaaa",
            "type": "Spreadsheet"
        }))
        .is_err());
    }

    #[test]
    fn computed_classification() {
        let computed: Vec<_> = FieldType::ALL
            .iter()
            .filter(|t| t.is_computed())
            .collect();
        assert_eq!(computed, vec![&FieldType::Lookup, &FieldType::Formula]);
    }

    #[test]
    fn field_from_frontmatter_entry() {
        let value = json!({
            "name": "status",
            "id": "st4tus",
            "type": "Select",
            "options": { "valuesList": { "1": "todo", "2": "done" } },
            "display": "asList",
            "style": { "bold": true }
        });
        let field = Field::from_value(&value).unwrap();
        assert_eq!(field.name, "status");
        assert_eq!(field.type_, FieldType::Select);
        assert!(field.options.contains_key("valuesList"));
        assert_eq!(field.display, Some(MultiDisplay::AsList));
        assert_eq!(field.style.unwrap().get(&FieldStyle::Bold), Some(&true));
    }

    #[test]
    fn missing_type_defaults_to_input() {
        let field = Field::from_value(&json!({ "name": "note", "id": "n0t3aa" })).unwrap();
        assert_eq!(field.type_, FieldType::Input);
        assert!(field.options.is_empty());
    }

    #[test]
    fn legacy_path_becomes_parent() {
        let field = Field::from_value(&json!({
            "name": "street",
            "id": "str33t",
            "type": "Input",
            "path": "r00tid____addr01"
        }))
        .unwrap();
        assert_eq!(field.parent.as_deref(), Some("addr01"));

        let root = Field::from_value(&json!({
            "name": "address",
            "id": "addr01",
            "type": "Object",
            "path": ""
        }))
        .unwrap();
        assert_eq!(root.parent, None);
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Field::from_value(&json!({ "name": "  ", "id": "abcdef" })).unwrap_err();
        assert!(matches!(err, FieldsError::EmptyName { .. }));
    }

    #[test]
    fn serialized_field_uses_type_key() {
        let field = make_field("abcdef", "title", FieldType::Input);
        let yaml = serde_yaml_ng::to_string(&field).unwrap();
        assert!(yaml.contains("type: Input"));
        assert!(!yaml.contains("type_"));
        assert!(!yaml.contains("parent"));
    }

    #[test]
    fn display_falls_back_to_default_for_multi_types() {
        let mut multi = make_field("aaaaaa", "authors", FieldType::MultiFile);
        assert_eq!(multi.effective_display(MultiDisplay::AsList), MultiDisplay::AsList);
        multi.display = Some(MultiDisplay::AsArray);
        assert_eq!(multi.effective_display(MultiDisplay::AsList), MultiDisplay::AsArray);

        let mut single = make_field("bbbbbb", "title", FieldType::Input);
        single.display = Some(MultiDisplay::AsList);
        assert_eq!(single.effective_display(MultiDisplay::AsList), MultiDisplay::AsArray);
    }

    #[test]
    fn copy_from_replaces_options() {
        let mut target = make_field("aaaaaa", "a", FieldType::Input);
        target.options.insert("stale".into(), json!(1));
        let mut source = make_field("bbbbbb", "b", FieldType::Number);
        source.options.insert("step".into(), json!(2));
        source.parent = Some("cccccc".into());

        target.copy_from(&source);
        assert_eq!(target.id, "bbbbbb");
        assert_eq!(target.type_, FieldType::Number);
        assert!(!target.options.contains_key("stale"));
        assert_eq!(target.options.get("step"), Some(&json!(2)));
        assert_eq!(target.parent.as_deref(), Some("cccccc"));
    }

    #[test]
    fn validate_rejects_nested_root_only_type() {
        let parent = make_field("obj001", "address", FieldType::Object);
        let mut lookup = make_field("lkp001", "total", FieldType::Lookup);
        lookup.parent = Some("obj001".into());
        let scope = vec![parent, lookup.clone()];
        assert!(matches!(
            lookup.validate(&scope),
            Err(FieldsError::RootOnlyType { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_parent() {
        let mut child = make_field("chld01", "street", FieldType::Input);
        child.parent = Some("nope00".into());
        assert!(matches!(
            child.validate(std::slice::from_ref(&child)),
            Err(FieldsError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn validate_accepts_nested_field() {
        let parent = make_field("obj001", "address", FieldType::Object);
        let mut child = make_field("chld01", "street", FieldType::Input);
        child.parent = Some("obj001".into());
        let scope = vec![parent, child.clone()];
        assert!(child.validate(&scope).is_ok());
    }
}
