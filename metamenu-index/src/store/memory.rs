//! In-memory document store and query engine

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{DocumentCache, DocumentStore, PageMatch, QueryEngine};
use crate::error::{IndexError, Result};
use crate::frontmatter::ParsedDocument;
use crate::query::SourceQuery;

#[derive(Debug, Clone)]
struct StoredDocument {
    content: String,
    mtime: DateTime<Utc>,
    parsed: ParsedDocument,
}

/// Documents held in memory, keyed by path in insertion order.
///
/// Every write bumps the revision, the way a host query engine reindexes on
/// change. The vault starts ready.
#[derive(Debug)]
pub struct MemoryVault {
    documents: RwLock<IndexMap<String, StoredDocument>>,
    ready: AtomicBool,
    revision: AtomicU64,
}

impl Default for MemoryVault {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVault {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(IndexMap::new()),
            ready: AtomicBool::new(true),
            revision: AtomicU64::new(0),
        }
    }

    /// Insert or replace a document, modified now.
    pub async fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.insert_with_mtime(path, content, Utc::now()).await;
    }

    /// Insert or replace a document with an explicit modification time.
    pub async fn insert_with_mtime(
        &self,
        path: impl Into<String>,
        content: impl Into<String>,
        mtime: DateTime<Utc>,
    ) {
        let path = path.into();
        let content = content.into();
        let parsed = ParsedDocument::parse(&path, &content);
        self.documents.write().await.insert(
            path,
            StoredDocument {
                content,
                mtime,
                parsed,
            },
        );
        self.bump_revision();
    }

    /// Remove a document. Returns whether it existed.
    pub async fn remove(&self, path: &str) -> bool {
        let removed = self.documents.write().await.shift_remove(path).is_some();
        if removed {
            self.bump_revision();
        }
        removed
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn bump_revision(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }

    async fn paths_with_extension(&self, extension: &str) -> Vec<String> {
        self.documents
            .read()
            .await
            .keys()
            .filter(|p| p.ends_with(extension))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryVault {
    async fn markdown_documents(&self) -> Result<Vec<String>> {
        Ok(self.paths_with_extension(".md").await)
    }

    async fn canvas_documents(&self) -> Result<Vec<String>> {
        Ok(self.paths_with_extension(".canvas").await)
    }

    async fn exists(&self, path: &str) -> bool {
        self.documents.read().await.contains_key(path)
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.documents
            .read()
            .await
            .get(path)
            .map(|d| d.content.clone())
            .ok_or_else(|| IndexError::DocumentNotFound {
                path: path.to_string(),
            })
    }

    async fn cache(&self, path: &str) -> Option<DocumentCache> {
        self.documents
            .read()
            .await
            .get(path)
            .map(|d| DocumentCache {
                frontmatter: d.parsed.frontmatter.clone(),
                mtime: d.mtime,
            })
    }
}

#[async_trait]
impl QueryEngine for MemoryVault {
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
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|(path, _)| path.ends_with(".md"))
            .filter(|(path, doc)| query.matches(path, &doc.parsed.tags))
            .map(|(path, doc)| PageMatch {
                path: path.clone(),
                tags: doc.parsed.tags.clone(),
            })
            .collect())
    }

    async fn page_values(&self, path: &str) -> Option<Map<String, Value>> {
        self.documents
            .read()
            .await
            .get(path)
            .map(|d| d.parsed.values())
    }
}
