//! Directory-backed document store and query engine

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{DocumentCache, DocumentStore, PageMatch, QueryEngine};
use crate::error::{IndexError, Result};
use crate::frontmatter::ParsedDocument;
use crate::query::SourceQuery;

/// A vault rooted at a directory. Paths are relative to the root and use `/`.
/// Hidden files and directories are skipped.
#[derive(Debug)]
pub struct FsVault {
    root: PathBuf,
    ready: AtomicBool,
    revision: AtomicU64,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: AtomicBool::new(true),
            revision: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record that documents changed on disk.
    pub fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn list(&self, extension: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(IndexError::DocumentNotFound {
                path: self.root.display().to_string(),
            });
        }
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(%e, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|e| e.to_str()) != Some(extension)
            {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                paths.push(parts.join("/"));
            }
        }
        debug!(count = paths.len(), extension, "listed vault documents");
        Ok(paths)
    }

    async fn parsed(&self, path: &str) -> Result<ParsedDocument> {
        let content = self.read(path).await?;
        Ok(ParsedDocument::parse(path, &content))
    }
}

#[async_trait]
impl DocumentStore for FsVault {
    async fn markdown_documents(&self) -> Result<Vec<String>> {
        self.list("md")
    }

    async fn canvas_documents(&self) -> Result<Vec<String>> {
        self.list("canvas")
    }

    async fn exists(&self, path: &str) -> bool {
        fs::try_exists(self.absolute(path)).await.unwrap_or(false)
    }

    async fn read(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.absolute(path))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => IndexError::DocumentNotFound {
                    path: path.to_string(),
                },
                _ => IndexError::read_failure(path, e),
            })
    }

    async fn cache(&self, path: &str) -> Option<DocumentCache> {
        let metadata = fs::metadata(self.absolute(path)).await.ok()?;
        let mtime = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let parsed = self.parsed(path).await.ok()?;
        Some(DocumentCache {
            frontmatter: parsed.frontmatter,
            mtime,
        })
    }
}

#[async_trait]
impl QueryEngine for FsVault {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    async fn pages(&self, query: &str) -> Result<Vec<PageMatch>> {
        if !self.is_ready() {
            return Err(IndexError::unavailable("query engine"));
        }
        let query = SourceQuery::parse(query)?;
        let mut pages = Vec::new();
        for path in self.list("md")? {
            let parsed = match self.parsed(&path).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(%path, %e, "skipping unreadable document");
                    continue;
                }
            };
            if query.matches(&path, &parsed.tags) {
                pages.push(PageMatch {
                    path,
                    tags: parsed.tags,
                });
            }
        }
        Ok(pages)
    }

    async fn page_values(&self, path: &str) -> Option<Map<String, Value>> {
        self.parsed(path).await.ok().map(|p| p.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault_with(files: &[(&str, &str)]) -> (TempDir, FsVault) {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = tmp.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, content).unwrap();
        }
        let vault = FsVault::new(tmp.path());
        (tmp, vault)
    }

    #[tokio::test]
    async fn lists_relative_paths_and_skips_hidden() {
        let (_tmp, vault) = vault_with(&[
            ("Classes/Book.md", "---\nfields: []\n---\n"),
            ("notes/a.md", "#x"),
            (".obsidian/workspace.md", ""),
            ("board.canvas", "{\"nodes\":[]}"),
            ("image.png", ""),
        ]);
        assert_eq!(
            vault.markdown_documents().await.unwrap(),
            vec!["Classes/Book.md", "notes/a.md"]
        );
        assert_eq!(vault.canvas_documents().await.unwrap(), vec!["board.canvas"]);
    }

    #[tokio::test]
    async fn read_and_cache() {
        let (_tmp, vault) = vault_with(&[("a.md", "---\nfileClass: Book\n---\nrating:: 5\n")]);
        assert!(vault.exists("a.md").await);
        assert!(!vault.exists("missing.md").await);
        assert!(matches!(
            vault.read("missing.md").await,
            Err(IndexError::DocumentNotFound { .. })
        ));

        let cache = vault.cache("a.md").await.unwrap();
        assert_eq!(
            cache.frontmatter.unwrap().get("fileClass").and_then(|v| v.as_str()),
            Some("Book")
        );
        let values = vault.page_values("a.md").await.unwrap();
        assert_eq!(values.get("rating").and_then(|v| v.as_str()), Some("5"));
    }

    #[tokio::test]
    async fn query_pages() {
        let (_tmp, vault) = vault_with(&[("a.md", "#reading"), ("b.md", "plain")]);
        let pages = vault.pages("#reading").await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].path, "a.md");
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let vault = FsVault::new("/definitely/not/here");
        assert!(vault.markdown_documents().await.is_err());
    }
}
