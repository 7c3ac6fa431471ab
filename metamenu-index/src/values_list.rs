//! Option values read from notes.
//!
//! A field may take its allowed values from a note named by its
//! `valuesListNotePath` option, one value per line.

use indexmap::IndexMap;
use metamenu_fields::Field;
use tracing::{debug, warn};

use crate::context::IndexContext;
use crate::error::IndexError;

/// Option key naming the values note.
pub const VALUES_LIST_OPTION: &str = "valuesListNotePath";

/// One value per non-empty line, list bullets stripped.
pub fn parse_values_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Values notes referenced by any of the fields, without duplicates.
pub fn values_list_paths<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for field in fields {
        if let Some(path) = field.option_str(VALUES_LIST_OPTION).map(str::trim) {
            if !path.is_empty() && !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
    }
    paths
}

/// Read every values note. A missing note yields an empty list.
pub async fn load_values_lists(
    ctx: &IndexContext,
    paths: &[String],
) -> (IndexMap<String, Vec<String>>, Vec<IndexError>) {
    let mut lists = IndexMap::new();
    let mut issues = Vec::new();
    for path in paths {
        let values = if !ctx.store.exists(path).await {
            debug!(%path, "values note missing");
            Vec::new()
        } else {
            match ctx.store.read(path).await {
                Ok(content) => parse_values_list(&content),
                Err(e) => {
                    warn!(%path, %e, "unreadable values note");
                    issues.push(e);
                    Vec::new()
                }
            }
        };
        lists.insert(path.clone(), values);
    }
    (lists, issues)
}
