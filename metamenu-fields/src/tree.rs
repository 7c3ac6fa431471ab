//! Parent/child nesting of fields within one scope.
//!
//! A scope is the field list of a single class, or the preset list. Fields
//! reference their parent by id; only `Object` and `ObjectList` fields can be
//! parents. A parent id that is not found in scope makes the field rootless,
//! and every walk is bounded by the scope size so a corrupted definition with
//! a parent loop still terminates.

use crate::types::Field;

/// Find a field by id anywhere in the scope.
pub fn get_field<'a>(scope: &'a [Field], id: &str) -> Option<&'a Field> {
    scope.iter().find(|f| f.id == id)
}

/// Find a field by id that is allowed to hold children.
pub fn get_parent_candidate<'a>(scope: &'a [Field], id: &str) -> Option<&'a Field> {
    scope
        .iter()
        .find(|f| f.id == id && f.type_.is_nestable_parent())
}

/// Ancestors of a field, nearest first. Stops at a missing parent or a loop.
pub fn ancestors<'a>(scope: &'a [Field], field: &'a Field) -> Vec<&'a Field> {
    let mut chain: Vec<&Field> = Vec::new();
    let mut current = field;
    while let Some(parent_id) = current.parent.as_deref() {
        if chain.len() >= scope.len() || parent_id == field.id {
            break;
        }
        let Some(parent) = get_parent_candidate(scope, parent_id) else {
            break;
        };
        if chain.iter().any(|f| f.id == parent.id) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// True when `child_id` appears above `field_id` in the nesting tree.
pub fn has_itself_as_ancestor(scope: &[Field], field_id: &str, child_id: &str) -> bool {
    let mut current = get_field(scope, field_id);
    let mut steps = 0;
    while let Some(field) = current {
        let Some(parent_id) = field.parent.as_deref() else {
            return false;
        };
        if parent_id == child_id {
            return true;
        }
        steps += 1;
        if steps > scope.len() {
            return false;
        }
        current = get_field(scope, parent_id);
    }
    false
}

/// Human readable position of a field, e.g. `"address > street"`.
pub fn hierarchy_path(scope: &[Field], field_id: &str) -> String {
    let Some(field) = get_field(scope, field_id) else {
        return String::new();
    };
    let mut names: Vec<&str> = ancestors(scope, field)
        .into_iter()
        .map(|f| f.name.as_str())
        .collect();
    names.reverse();
    names.push(field.name.as_str());
    names.join(" > ")
}

/// Nestable fields of the scope other than `field`, with their display path.
pub fn other_nested_fields(scope: &[Field], field: &Field) -> Vec<(String, String)> {
    scope
        .iter()
        .filter(|f| f.type_.is_nestable_parent() && f.id != field.id)
        .map(|f| (f.id.clone(), hierarchy_path(scope, &f.id)))
        .collect()
}

/// Parents `field` may be moved under without creating a loop.
pub fn compatible_parent_fields(scope: &[Field], field: &Field) -> Vec<(String, String)> {
    let others = other_nested_fields(scope, field);
    if !field.type_.is_nestable_parent() {
        return others;
    }
    others
        .into_iter()
        .filter(|(id, _)| !has_itself_as_ancestor(scope, id, &field.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn field(id: &str, name: &str, type_: FieldType, parent: Option<&str>) -> Field {
        let mut f = Field::create_default(name);
        f.id = id.into();
        f.type_ = type_;
        f.parent = parent.map(str::to_string);
        f
    }

    fn address_scope() -> Vec<Field> {
        vec![
            field("person", "person", FieldType::Object, None),
            field("addr01", "address", FieldType::Object, Some("person")),
            field("str33t", "street", FieldType::Input, Some("addr01")),
            field("phones", "phones", FieldType::ObjectList, None),
        ]
    }

    #[test]
    fn path_walks_to_root() {
        let scope = address_scope();
        assert_eq!(hierarchy_path(&scope, "str33t"), "person > address > street");
        assert_eq!(hierarchy_path(&scope, "person"), "person");
        assert_eq!(hierarchy_path(&scope, "missing"), "");
    }

    #[test]
    fn missing_parent_makes_field_rootless() {
        let scope = vec![field("orphan", "orphan", FieldType::Input, Some("gone00"))];
        assert!(ancestors(&scope, &scope[0]).is_empty());
        assert_eq!(hierarchy_path(&scope, "orphan"), "orphan");
    }

    #[test]
    fn ancestor_detection() {
        let scope = address_scope();
        assert!(has_itself_as_ancestor(&scope, "str33t", "person"));
        assert!(has_itself_as_ancestor(&scope, "addr01", "person"));
        assert!(!has_itself_as_ancestor(&scope, "person", "str33t"));
        assert!(!has_itself_as_ancestor(&scope, "phones", "person"));
    }

    #[test]
    fn compatible_parents_exclude_descendants() {
        let scope = address_scope();
        let person = &scope[0];
        let parents: Vec<_> = compatible_parent_fields(&scope, person)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(parents, vec!["phones".to_string()]);

        let street = &scope[2];
        let parents: Vec<_> = compatible_parent_fields(&scope, street)
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        assert_eq!(
            parents,
            vec!["person".to_string(), "person > address".into(), "phones".into()]
        );
    }

    #[test]
    fn parent_loop_terminates() {
        let scope = vec![
            field("aaaaaa", "a", FieldType::Object, Some("bbbbbb")),
            field("bbbbbb", "b", FieldType::Object, Some("cccccc")),
            field("cccccc", "c", FieldType::Object, Some("bbbbbb")),
        ];
        assert_eq!(ancestors(&scope, &scope[0]).len(), 2);
        assert!(!has_itself_as_ancestor(&scope, "aaaaaa", "zzzzzz"));
        assert!(has_itself_as_ancestor(&scope, "aaaaaa", "cccccc"));
    }
}
