//! Human-readable change descriptions.

use crate::schema::value::{FieldMap, FieldValue};

/// Describe how `after` differs from `before`, one line per changed field.
///
/// Only fields present in `after` are compared. Returns `None` when
/// nothing changed.
pub fn describe_changes(before: &FieldMap, after: &FieldMap) -> Option<String> {
    let lines: Vec<String> = after
        .iter()
        .filter_map(|(name, new)| {
            let old = before.get(name).unwrap_or(&FieldValue::Null);
            (old != new).then(|| format!("{name}: {old} -> {new}"))
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_lists_changed_fields_only() {
        let before = map(&[("field1", "foo"), ("field2", "same")]);
        let after = map(&[("field1", "bar"), ("field2", "same")]);
        assert_eq!(
            describe_changes(&before, &after).as_deref(),
            Some("field1: \"foo\" -> \"bar\"")
        );
    }

    #[test]
    fn test_ignores_fields_absent_from_after() {
        let before = map(&[("field1", "foo"), ("field2", "bar")]);
        let after = map(&[("field1", "foo")]);
        assert_eq!(describe_changes(&before, &after), None);
    }

    #[test]
    fn test_new_field_compares_against_null() {
        let after = map(&[("field1", "x")]);
        assert_eq!(
            describe_changes(&FieldMap::new(), &after).as_deref(),
            Some("field1: null -> \"x\"")
        );
    }
}
