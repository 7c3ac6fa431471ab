//! Incremental metadata index for frontmatter documents
//!
//! Given a corpus of markdown documents, this crate works out which fields
//! apply to every document. Fields come from class definition documents
//! ("file classes"), which a document joins through its own frontmatter, a
//! mapped tag, a configured query, or the global fallback class. Preset fields
//! from the settings apply when nothing else does.
//!
//! ## Overview
//!
//! - **Registry** ([`registry`]) - discovers class definitions, resolves `extends`
//!   chains and inheritance, buckets legacy versions, maps tags to classes
//! - **Matchers** ([`matchers`]) - per-document contributions from inner class
//!   references, tags and queries
//! - **Resolution** ([`resolve`]) - merges contributions by priority into one field
//!   list per document, and extracts lookup/formula fields
//! - **Existence** ([`existence`]) - which lookup/formula fields have a value
//! - **Orchestrator** ([`FieldIndex`]) - runs a full pass and publishes an
//!   immutable [`IndexSnapshot`]
//! - **Controller** ([`ChangeReactor`]) - turns change notifications into full or
//!   incremental updates
//!
//! The host provides storage, the query engine and the lookup/formula engines
//! through the traits in [`store`], bundled in an [`IndexContext`].
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use metamenu_index::{FieldIndex, IndexContext, IndexSettings, store::FsVault};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = IndexSettings::load(None)?;
//! let vault = Arc::new(FsVault::new("/path/to/vault"));
//! let index = FieldIndex::new(IndexContext::new(settings, vault.clone(), vault));
//!
//! index.full_index("startup", false, false).await;
//! let snapshot = index.snapshot().await;
//! for field in snapshot.fields_for("notes/book.md") {
//!     println!("{}: {}", field.name, field.type_);
//! }
//! # Ok(())
//! # }
//! ```

pub mod canvas;
pub mod config;
mod context;
pub mod controller;
mod error;
pub mod existence;
pub mod fileclass;
pub mod frontmatter;
mod index;
pub mod matchers;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod snapshot;
pub mod store;
pub mod tags;
pub mod values_list;

pub use config::{FileClassQuery, IndexSettings};
pub use context::IndexContext;
pub use controller::{ChangeKind, ChangeReactor, IgnoreReason, IndexEvent, Reaction};
pub use error::{IndexError, Result};
pub use existence::ExistenceTracker;
pub use fileclass::{FileClass, FileClassDefinition};
pub use index::{FieldIndex, IndexOutcome, IndexReport, IndexStatus};
pub use resolve::{Resolution, ResolutionSource};
pub use snapshot::{DocumentFields, IndexSnapshot};

pub use metamenu_fields::{Field, FieldType};
