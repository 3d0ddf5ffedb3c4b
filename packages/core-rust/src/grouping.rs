//! Bucketing of a raw patch by owning group.
//!
//! This is the pure half of patch resolution: given the client's field ID ->
//! value map and the field declarations returned by the registry, produce
//! group ID -> values. No I/O happens here, which keeps the all-or-nothing
//! rule easy to test in isolation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::PatchError;
use crate::types::{Field, PropertyValues, RawPatch};

/// Group ID -> the subset of the patch owned by that group.
pub type GroupedValues = BTreeMap<String, PropertyValues>;

/// Collects the distinct field IDs referenced by a patch.
#[must_use]
pub fn field_ids(patch: &RawPatch) -> BTreeSet<String> {
    patch.keys().cloned().collect()
}

/// Splits `patch` into per-group buckets using the resolved `fields`.
///
/// Fails with [`PatchError::UnknownField`] on the first (smallest) field ID
/// that has no declaration; in that case nothing is returned. A declaration
/// filed under a different ID than its own is a registry fault and fails
/// with [`PatchError::FieldResolutionFailed`]. Declarations for IDs not
/// present in the patch are ignored.
pub fn group_by_owner(
    patch: RawPatch,
    fields: &HashMap<String, Field>,
) -> Result<GroupedValues, PatchError> {
    patch
        .into_iter()
        .try_fold(GroupedValues::new(), |mut grouped, (field_id, value)| {
            let Some(field) = fields.get(&field_id) else {
                return Err(PatchError::UnknownField { field_id });
            };
            if field.id != field_id {
                return Err(PatchError::field_resolution(anyhow::anyhow!(
                    "registry answered field {field_id} with declaration {}",
                    field.id
                )));
            }
            grouped
                .entry(field.group_id.clone())
                .or_default()
                .insert(field_id, value);
            Ok(grouped)
        })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn declarations(pairs: &[(&str, &str)]) -> HashMap<String, Field> {
        pairs
            .iter()
            .map(|(id, group)| ((*id).to_string(), Field::new(*id, *group)))
            .collect()
    }

    #[test]
    fn groups_fields_under_their_owner() {
        let fields = declarations(&[("f1", "G"), ("f2", "G"), ("f3", "H")]);
        let patch: RawPatch = [
            ("f1".to_string(), json!("a")),
            ("f2".to_string(), json!("b")),
            ("f3".to_string(), json!(true)),
        ]
        .into_iter()
        .collect();

        let grouped = group_by_owner(patch, &fields).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["G"].len(), 2);
        assert_eq!(grouped["G"]["f1"], json!("a"));
        assert_eq!(grouped["G"]["f2"], json!("b"));
        assert_eq!(grouped["H"]["f3"], json!(true));
    }

    #[test]
    fn unknown_field_fails_whole_patch() {
        let fields = declarations(&[("f1", "G")]);
        let patch: RawPatch = [
            ("f1".to_string(), json!("a")),
            ("fX".to_string(), json!("b")),
        ]
        .into_iter()
        .collect();

        let err = group_by_owner(patch, &fields).unwrap_err();
        assert!(matches!(err, PatchError::UnknownField { field_id } if field_id == "fX"));
    }

    #[test]
    fn reports_smallest_unknown_field() {
        let fields = declarations(&[("b", "G")]);
        let patch: RawPatch = [
            ("z".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
            ("c".to_string(), json!(3)),
        ]
        .into_iter()
        .collect();

        let err = group_by_owner(patch, &fields).unwrap_err();
        assert_eq!(err.offending_id(), Some("c"));
    }

    #[test]
    fn declaration_under_foreign_key_is_rejected() {
        let mut fields = declarations(&[("f1", "G")]);
        fields.insert("f2".to_string(), Field::new("f9", "H"));
        let patch: RawPatch = [
            ("f1".to_string(), json!("a")),
            ("f2".to_string(), json!("b")),
        ]
        .into_iter()
        .collect();

        let err = group_by_owner(patch, &fields).unwrap_err();
        assert_eq!(err.kind(), "field_resolution_failed");
        assert!(err.to_string().contains("f9"));
    }

    #[test]
    fn empty_patch_yields_no_groups() {
        let grouped = group_by_owner(RawPatch::new(), &HashMap::new()).unwrap();
        assert!(grouped.is_empty());
    }

    #[test]
    fn extra_declarations_are_ignored() {
        let fields = declarations(&[("f1", "G"), ("unused", "H")]);
        let patch: RawPatch = std::iter::once(("f1".to_string(), json!(null))).collect();

        let grouped = group_by_owner(patch, &fields).unwrap();
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["G"]);
    }

    fn arb_declared_patch() -> impl Strategy<Value = (RawPatch, HashMap<String, Field>)> {
        prop::collection::btree_map("[a-z]{1,6}", (0u8..4, any::<i64>()), 1..24).prop_map(
            |entries| {
                let mut patch = RawPatch::new();
                let mut fields = HashMap::new();
                for (id, (group, value)) in entries {
                    fields.insert(id.clone(), Field::new(id.clone(), format!("group-{group}")));
                    patch.insert(id, json!(value));
                }
                (patch, fields)
            },
        )
    }

    proptest! {
        #[test]
        fn every_field_lands_once_under_its_owner((patch, fields) in arb_declared_patch()) {
            let grouped = group_by_owner(patch.clone(), &fields).unwrap();

            let mut seen = PropertyValues::new();
            for (group_id, values) in &grouped {
                prop_assert!(!values.is_empty());
                for (field_id, value) in values {
                    prop_assert_eq!(&fields[field_id].group_id, group_id);
                    prop_assert!(seen.insert(field_id.clone(), value.clone()).is_none());
                }
            }
            prop_assert_eq!(seen, patch);
        }
    }
}
