//! Which lookup and formula fields currently have a value in each document.

use indexmap::IndexMap;
use metamenu_fields::Field;
use serde_json::{Map, Value};

use crate::store::QueryEngine;

/// Existing lookup/formula fields by document path.
///
/// A document with no existing field has no entry at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistenceTracker {
    existing: IndexMap<String, Vec<Field>>,
}

impl ExistenceTracker {
    /// Recompute one document from its materialized values.
    ///
    /// A field exists when its name is a key of `values`, whatever the value,
    /// `null` included. Returns the number of existing fields.
    pub fn refresh(
        &mut self,
        path: &str,
        tracked: &[Field],
        values: Option<&Map<String, Value>>,
    ) -> usize {
        let existing: Vec<Field> = match values {
            Some(values) => tracked
                .iter()
                .filter(|f| f.is_computed() && values.contains_key(&f.name))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let count = existing.len();
        if existing.is_empty() {
            self.existing.shift_remove(path);
        } else {
            self.existing.insert(path.to_string(), existing);
        }
        count
    }

    /// Recompute one document, reading its values from the engine.
    pub async fn refresh_document(
        &mut self,
        engine: &dyn QueryEngine,
        path: &str,
        tracked: &[Field],
    ) -> usize {
        let values = engine.page_values(path).await;
        self.refresh(path, tracked, values.as_ref())
    }

    /// Recompute every document with tracked fields.
    pub async fn refresh_all<'a>(
        &mut self,
        engine: &dyn QueryEngine,
        tracked: impl IntoIterator<Item = (&'a String, &'a [Field])>,
    ) {
        for (path, fields) in tracked {
            self.refresh_document(engine, path, fields).await;
        }
        tracing::debug!(documents = self.existing.len(), "lookup and formula existence refreshed");
    }

    /// Existing fields of a document, empty if none.
    pub fn existing(&self, path: &str) -> &[Field] {
        self.existing
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.existing.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.existing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.existing.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Field>)> {
        self.existing.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVault;
    use metamenu_fields::FieldType;
    use serde_json::json;

    fn lookup(name: &str) -> Field {
        Field {
            id: format!("{name}0"),
            type_: FieldType::Lookup,
            ..Field::create_default(name)
        }
    }

    #[test]
    fn defined_then_undefined() {
        let mut tracker = ExistenceTracker::default();
        let tracked = vec![lookup("books"), lookup("authors")];

        let values = json!({"books": ["a"], "authors": null});
        assert_eq!(tracker.refresh("a.md", &tracked, values.as_object()), 2);
        assert_eq!(tracker.existing("a.md").len(), 2);

        let values = json!({"books": []});
        assert_eq!(tracker.refresh("a.md", &tracked, values.as_object()), 1);
        assert_eq!(tracker.existing("a.md")[0].name, "books");

        let values = json!({"other": 1});
        assert_eq!(tracker.refresh("a.md", &tracked, values.as_object()), 0);
        assert!(!tracker.contains("a.md"));
        assert!(tracker.is_empty());
    }

    #[test]
    fn non_computed_fields_are_ignored() {
        let mut tracker = ExistenceTracker::default();
        let plain = Field::create_default("title");
        let values = json!({"title": "x"});
        tracker.refresh("a.md", &[plain], values.as_object());
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn single_and_bulk_refresh_agree() {
        let vault = MemoryVault::new();
        vault.insert("a.md", "---\nbooks: [x]\n---\n").await;
        vault.insert("b.md", "authors:: someone\n").await;
        let tracked = vec![lookup("books"), lookup("authors")];

        let mut bulk = ExistenceTracker::default();
        let paths = ["a.md".to_string(), "b.md".to_string()];
        bulk.refresh_all(&vault, paths.iter().map(|p| (p, tracked.as_slice())))
            .await;

        let mut single = ExistenceTracker::default();
        for path in &paths {
            single.refresh_document(&vault, path, &tracked).await;
        }
        assert_eq!(bulk, single);
        assert_eq!(bulk.existing("a.md")[0].name, "books");
        assert_eq!(bulk.existing("b.md")[0].name, "authors");
    }
}
