//! Collaborator contracts consumed by the index.
//!
//! The host owns document storage, the query engine, lookup/formula
//! recomputation and legacy class migration. The index reaches all of them
//! through these traits. [`MemoryVault`] and [`FsVault`] are reference
//! implementations of storage and querying.

mod fs;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::fileclass::FileClass;
use crate::snapshot::IndexSnapshot;

pub use fs::FsVault;
pub use memory::MemoryVault;

/// Parsed metadata of one document as cached by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCache {
    pub frontmatter: Option<Map<String, Value>>,
    pub mtime: DateTime<Utc>,
}

/// A document returned by the query engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMatch {
    pub path: String,
    /// Tags with their `#` prefix
    pub tags: Vec<String>,
}

/// Document storage
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Paths of every markdown document
    async fn markdown_documents(&self) -> Result<Vec<String>>;

    /// Paths of every canvas document
    async fn canvas_documents(&self) -> Result<Vec<String>>;

    /// Whether a document exists
    async fn exists(&self, path: &str) -> bool;

    /// Raw text of a document
    async fn read(&self, path: &str) -> Result<String>;

    /// Parsed frontmatter and modification time, if the document is cached
    async fn cache(&self, path: &str) -> Option<DocumentCache>;
}

/// Tag and page query engine
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Whether the engine finished its initial scan
    fn is_ready(&self) -> bool;

    /// Counter bumped by the engine every time its own index changes
    fn revision(&self) -> u64;

    /// Documents matching a query string
    async fn pages(&self, query: &str) -> Result<Vec<PageMatch>>;

    /// Materialized field values of a document (frontmatter and inline fields)
    async fn page_values(&self, path: &str) -> Option<Map<String, Value>>;
}

/// What a lookup or formula recomputation should cover.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputeScope {
    /// Trigger that asked for the recomputation, for logs
    pub source: String,
    /// Single document to recompute, or all documents when `None`
    pub document: Option<String>,
    /// Recompute every value instead of only those whose inputs changed
    pub force_all: bool,
}

impl ComputeScope {
    /// Every document, only changed inputs.
    pub fn all(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// One document.
    pub fn document(source: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            document: Some(path.into()),
            force_all: false,
        }
    }

    /// Every document, every value.
    pub fn forced(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            document: None,
            force_all: true,
        }
    }
}

/// External lookup, formula and canvas recomputation.
#[async_trait]
pub trait ComputedFields: Send + Sync {
    /// Resolve lookup relations between documents
    async fn resolve_lookups(&self, snapshot: &IndexSnapshot) -> Result<()>;

    /// Write lookup values
    async fn update_lookups(&self, snapshot: &IndexSnapshot, scope: &ComputeScope) -> Result<()>;

    /// Evaluate formula fields
    async fn update_formulas(&self, snapshot: &IndexSnapshot, scope: &ComputeScope) -> Result<()>;

    /// Drop formula values whose field no longer exists
    async fn clean_removed_formulas(&self, snapshot: &IndexSnapshot) -> Result<()>;

    /// Recompute canvas fields of documents linked from a canvas
    async fn update_canvas(&self, snapshot: &IndexSnapshot, canvas_path: &str) -> Result<()>;
}

/// Computed fields are left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoComputedFields;

#[async_trait]
impl ComputedFields for NoComputedFields {
    async fn resolve_lookups(&self, _snapshot: &IndexSnapshot) -> Result<()> {
        Ok(())
    }

    async fn update_lookups(&self, _snapshot: &IndexSnapshot, _scope: &ComputeScope) -> Result<()> {
        Ok(())
    }

    async fn update_formulas(&self, _snapshot: &IndexSnapshot, _scope: &ComputeScope) -> Result<()> {
        Ok(())
    }

    async fn clean_removed_formulas(&self, _snapshot: &IndexSnapshot) -> Result<()> {
        Ok(())
    }

    async fn update_canvas(&self, _snapshot: &IndexSnapshot, _canvas_path: &str) -> Result<()> {
        Ok(())
    }
}

/// Rewrites a legacy class definition to a newer major version.
#[async_trait]
pub trait ClassMigrator: Send + Sync {
    /// Rewrite `class` to `target_major`. Returns whether anything was migrated.
    async fn migrate(&self, class: &FileClass, target_major: u32) -> Result<bool>;
}

/// Legacy classes stay as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMigration;

#[async_trait]
impl ClassMigrator for NoMigration {
    async fn migrate(&self, class: &FileClass, target_major: u32) -> Result<bool> {
        tracing::debug!(class = %class.name, target_major, "migration disabled");
        Ok(false)
    }
}

/// Receives index lifecycle events.
pub trait IndexObserver: Send + Sync {
    /// The controller finished its startup
    fn indexed(&self) {}

    /// A full pass published a new snapshot
    fn index_updated(&self, _generation: u64) {}

    /// A message meant for the user
    fn notice(&self, _message: &str) {}
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl IndexObserver for LogObserver {
    fn indexed(&self) {
        tracing::info!("metadata index ready");
    }

    fn index_updated(&self, generation: u64) {
        tracing::debug!(generation, "metadata index updated");
    }

    fn notice(&self, message: &str) {
        tracing::warn!(%message, "notice");
    }
}
