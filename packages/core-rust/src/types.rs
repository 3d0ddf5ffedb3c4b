use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque, undecoded property value as submitted by the client.
pub type RawValue = serde_json::Value;

/// Field ID -> raw value. Used both for client input and handler output.
///
/// `BTreeMap` keeps iteration deterministic; key order carries no meaning.
pub type PropertyValues = BTreeMap<String, RawValue>;

/// Client input for a single edit request: field ID -> raw value.
pub type RawPatch = PropertyValues;

/// A declared property slot. Owned by exactly one [`Group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Unique field identifier.
    pub id: String,
    /// Identifier of the owning group.
    pub group_id: String,
    /// Optional display name, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Field {
    #[must_use]
    pub fn new(id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            name: None,
        }
    }
}

/// A named domain owning a set of fields and one authorization policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier.
    pub id: String,
    /// Human-readable name; the key into the permission handler registry.
    pub name: String,
}

impl Group {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The slice of a patch whose fields belong to one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPatch {
    /// The resolved owning group.
    pub group: Group,
    /// Field ID -> raw value, pending or post authorization.
    pub values: PropertyValues,
}

/// Group ID -> [`GroupPatch`]: a fully resolved, authorized patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchResult {
    groups: BTreeMap<String, GroupPatch>,
}

impl PatchResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the patch for its group, replacing any previous entry.
    pub fn insert(&mut self, patch: GroupPatch) -> Option<GroupPatch> {
        self.groups.insert(patch.group.id.clone(), patch)
    }

    #[must_use]
    pub fn get(&self, group_id: &str) -> Option<&GroupPatch> {
        self.groups.get(group_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates group patches in group ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &GroupPatch)> {
        self.groups.iter()
    }

    /// Total number of field values across all groups.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.groups.values().map(|p| p.values.len()).sum()
    }

    /// Collapses the per-group view back into a single field ID -> value map.
    ///
    /// This is the wire shape returned to clients.
    #[must_use]
    pub fn flatten(&self) -> PropertyValues {
        self.groups
            .values()
            .flat_map(|p| p.values.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }
}

impl FromIterator<GroupPatch> for PatchResult {
    fn from_iter<I: IntoIterator<Item = GroupPatch>>(iter: I) -> Self {
        let mut result = Self::new();
        for patch in iter {
            result.insert(patch);
        }
        result
    }
}

impl IntoIterator for PatchResult {
    type Item = (String, GroupPatch);
    type IntoIter = std::collections::btree_map::IntoIter<String, GroupPatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}
