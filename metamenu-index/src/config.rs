//! Index settings loaded with figment.
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Default values (`#[serde(default)]` on [`IndexSettings`])
//! 2. A settings file (`.toml`, `.yaml`/`.yml` or `.json`, chosen by extension)
//! 3. Environment variables prefixed with `METAMENU_`

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use metamenu_fields::{Field, MultiDisplay};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Default frontmatter key holding a document's class reference(s).
pub const DEFAULT_FILE_CLASS_ALIAS: &str = "fileClass";

/// A named query whose matching documents join a class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileClassQuery {
    pub name: String,
    #[serde(default)]
    pub id: String,
    pub query: String,
    #[serde(alias = "fileClassName")]
    pub file_class_name: String,
}

/// Settings read by every index pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexSettings {
    /// Folder holding class definition documents, e.g. `Classes/`
    #[serde(alias = "classFilesPath")]
    pub class_files_path: Option<String>,
    /// Frontmatter key naming a document's classes
    #[serde(alias = "fileClassAlias")]
    pub file_class_alias: String,
    /// Class applied to documents that match nothing else
    #[serde(alias = "globalFileClass")]
    pub global_file_class: Option<String>,
    /// Queries mapping matching documents to classes
    #[serde(alias = "fileClassQueries")]
    pub file_class_queries: Vec<FileClassQuery>,
    /// Fields applied when no class applies
    #[serde(alias = "presetFields")]
    pub preset_fields: Vec<Field>,
    /// Default display of multi-valued fields
    #[serde(alias = "frontmatterListDisplay")]
    pub frontmatter_list_display: MultiDisplay,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            class_files_path: None,
            file_class_alias: DEFAULT_FILE_CLASS_ALIAS.to_string(),
            global_file_class: None,
            file_class_queries: Vec::new(),
            preset_fields: Vec::new(),
            frontmatter_list_display: MultiDisplay::AsArray,
        }
    }
}

impl IndexSettings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let settings: IndexSettings = Self::figment(file).extract()?;
        debug!(
            class_files_path = ?settings.class_files_path,
            queries = settings.file_class_queries.len(),
            presets = settings.preset_fields.len(),
            "index settings loaded"
        );
        Ok(settings)
    }

    /// Build the figment with all sources in precedence order.
    pub fn figment(file: Option<&Path>) -> Figment {
        // Defaults are not merged as a provider: the file may use the camelCase
        // aliases, which would collide with snake_case default keys.
        let mut figment = Figment::new();
        if let Some(path) = file {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Yaml::file(path)),
            };
        }
        figment.merge(Env::prefixed("METAMENU_"))
    }

    /// Class folder with a guaranteed trailing `/`, if configured.
    pub fn class_folder(&self) -> Option<String> {
        let path = self.class_files_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        })
    }

    /// Whether the document lives in the class folder.
    pub fn is_class_document(&self, path: &str) -> bool {
        self.class_folder()
            .is_some_and(|folder| path.starts_with(&folder))
    }

    /// Class name of a class definition document: its path below the class
    /// folder without the `.md` extension.
    pub fn class_name_for(&self, path: &str) -> Option<String> {
        let folder = self.class_folder()?;
        let name = path.strip_prefix(&folder)?.strip_suffix(".md")?;
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Path of the class definition document for a class name.
    pub fn class_path_for(&self, name: &str) -> Option<String> {
        self.class_folder().map(|folder| format!("{folder}{name}.md"))
    }
}
