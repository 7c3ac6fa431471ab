//! Canvas documents and the files they embed.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::IndexContext;
use crate::error::{IndexError, Result};

/// Node of a canvas. Only file nodes matter to the index.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CanvasNode {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub file: Option<String>,
}

/// Parsed canvas document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CanvasData {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

impl CanvasData {
    /// Parse canvas JSON. Blank content is an empty canvas.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }

    /// Files of `file` nodes, first occurrence order, without duplicates.
    pub fn linked_files(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for node in self.nodes.iter().filter(|n| n.kind == "file") {
            if let Some(file) = &node.file {
                if !files.contains(file) {
                    files.push(file.clone());
                }
            }
        }
        files
    }
}

/// Linked files of every canvas document.
///
/// A canvas that cannot be read or parsed is reported to the user through
/// the observer and recorded with no linked files.
pub async fn scan_canvases(ctx: &IndexContext) -> (IndexMap<String, Vec<String>>, Vec<IndexError>) {
    let mut canvases = IndexMap::new();
    let mut issues = Vec::new();

    let paths = match ctx.store.canvas_documents().await {
        Ok(paths) => paths,
        Err(e) => {
            warn!(%e, "canvas documents unavailable");
            return (canvases, vec![e]);
        }
    };

    for path in paths {
        let parsed = match ctx.store.read(&path).await {
            Ok(content) => CanvasData::parse(&content),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(canvas) => {
                canvases.insert(path, canvas.linked_files());
            }
            Err(e) => {
                warn!(%path, %e, "unreadable canvas");
                ctx.observer.notice(&format!("Couldn't read {path}"));
                issues.push(IndexError::read_failure(&path, e));
                canvases.insert(path, Vec::new());
            }
        }
    }
    debug!(canvases = canvases.len(), "canvas documents scanned");
    (canvases, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_files_only_from_file_nodes() {
        let canvas = CanvasData::parse(
            r#"{
                "nodes": [
                    {"id": "1", "type": "file", "file": "notes/a.md"},
                    {"id": "2", "type": "text", "text": "hello"},
                    {"id": "3", "type": "file", "file": "notes/b.md"},
                    {"id": "4", "type": "file", "file": "notes/a.md"},
                    {"id": "5", "type": "group"}
                ],
                "edges": [{"id": "e", "fromNode": "1", "toNode": "3"}]
            }"#,
        )
        .unwrap();
        assert_eq!(canvas.linked_files(), vec!["notes/a.md", "notes/b.md"]);
        assert_eq!(canvas.edges.len(), 1);
    }

    #[test]
    fn blank_and_invalid_content() {
        assert!(CanvasData::parse("  ").unwrap().linked_files().is_empty());
        assert!(CanvasData::parse("{not json").is_err());
        assert!(CanvasData::parse("{}").unwrap().nodes.is_empty());
    }
}
