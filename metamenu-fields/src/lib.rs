//! Field definitions for metadata classes
//!
//! `metamenu-fields` is a schema-only crate describing the metadata attributes
//! a document can carry. It knows nothing about documents, tags or indexing;
//! the index crate groups fields into classes and resolves them per document.
//!
//! # Architecture
//!
//! - **Closed type set**: [`FieldType`] is an exhaustive enum; every behaviour
//!   that depends on the type (display, nesting, computed values) is a `match`
//! - **Stable short ids**: six alphanumeric characters, checked against every
//!   id already in use ([`new_field_id`])
//! - **Nesting by reference**: a field points at its parent by id; the tree is
//!   scoped to one class or to the preset list ([`tree`])

pub mod error;
pub mod id;
pub mod tree;
pub mod types;

pub use error::{FieldsError, Result};
pub use id::{new_field_id, new_field_id_with, FIELD_ID_LENGTH};
pub use types::{Field, FieldCommand, FieldStyle, FieldType, MultiDisplay, Options};
