//! In-memory property definitions backed by [`DashMap`].
//!
//! Serves as both the [`FieldRegistry`] and the [`GroupRegistry`] for the
//! development server and tests. Definitions can be seeded from a JSON file
//! at startup; after that they are only read.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use dashmap::DashMap;
use postprop_core::{Field, Group};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::traits::{FieldRegistry, GroupRegistry};

/// On-disk shape of a definitions seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionsFile {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// Field and group declarations held in memory.
///
/// Field lookups are not scoped by target: every declared field applies to
/// every post.
pub struct PropertyDefinitions {
    groups: DashMap<String, Group>,
    fields: DashMap<String, Field>,
}

impl PropertyDefinitions {
    /// Creates an empty set of definitions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            fields: DashMap::new(),
        }
    }

    /// Builds definitions from a parsed seed file.
    ///
    /// # Errors
    ///
    /// Returns an error if IDs repeat or a field names an undeclared group.
    pub fn from_file_contents(file: DefinitionsFile) -> anyhow::Result<Self> {
        let defs = Self::new();
        for group in file.groups {
            defs.add_group(group)?;
        }
        for field in file.fields {
            defs.add_field(field)?;
        }
        Ok(defs)
    }

    /// Reads and validates a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails the checks of [`Self::from_file_contents`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading property definitions from {}", path.display()))?;
        let file: DefinitionsFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing property definitions in {}", path.display()))?;
        let defs = Self::from_file_contents(file)?;
        info!(
            groups = defs.group_count(),
            fields = defs.field_count(),
            "loaded property definitions from {}",
            path.display()
        );
        Ok(defs)
    }

    /// Declares a group.
    ///
    /// # Errors
    ///
    /// Returns an error if a group with the same ID already exists.
    pub fn add_group(&self, group: Group) -> anyhow::Result<()> {
        if self.groups.contains_key(&group.id) {
            bail!("duplicate property group id {}", group.id);
        }
        self.groups.insert(group.id.clone(), group);
        Ok(())
    }

    /// Declares a field.
    ///
    /// # Errors
    ///
    /// Returns an error if the field ID is taken or its group is unknown.
    pub fn add_field(&self, field: Field) -> anyhow::Result<()> {
        if self.fields.contains_key(&field.id) {
            bail!("duplicate property field id {}", field.id);
        }
        if !self.groups.contains_key(&field.group_id) {
            bail!(
                "property field {} references unknown group {}",
                field.id,
                field.group_id
            );
        }
        self.fields.insert(field.id.clone(), field);
        Ok(())
    }

    /// Returns the declaration of a single field.
    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<Field> {
        self.fields.get(field_id).map(|f| f.clone())
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl Default for PropertyDefinitions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FieldRegistry for PropertyDefinitions {
    async fn lookup_fields(
        &self,
        _target_id: &str,
        field_ids: &BTreeSet<String>,
    ) -> anyhow::Result<HashMap<String, Field>> {
        Ok(field_ids
            .iter()
            .filter_map(|id| self.field(id).map(|f| (id.clone(), f)))
            .collect())
    }
}

#[async_trait]
impl GroupRegistry for PropertyDefinitions {
    async fn lookup_group(&self, group_id: &str) -> anyhow::Result<Group> {
        self.groups
            .get(group_id)
            .map(|g| g.clone())
            .with_context(|| format!("property group {group_id} not found"))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use serde_json::json;

    use super::*;

    fn seeded() -> PropertyDefinitions {
        PropertyDefinitions::from_file_contents(DefinitionsFile {
            groups: vec![Group::new("G", "content_flagging"), Group::new("H", "other")],
            fields: vec![Field::new("f1", "G"), Field::new("f2", "G"), Field::new("f3", "H")],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn lookup_fields_returns_only_declared_ids() {
        let defs = seeded();
        let ids: BTreeSet<String> = ["f1", "f3", "missing"].iter().map(ToString::to_string).collect();

        let found = defs.lookup_fields("post1", &ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["f1"].group_id, "G");
        assert_eq!(found["f3"].group_id, "H");
        assert!(!found.contains_key("missing"));
    }

    #[tokio::test]
    async fn lookup_group_missing_is_error() {
        let defs = seeded();
        assert_eq!(defs.lookup_group("G").await.unwrap().name, "content_flagging");

        let err = defs.lookup_group("nope").await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn rejects_field_with_unknown_group() {
        let err = PropertyDefinitions::from_file_contents(DefinitionsFile {
            groups: vec![],
            fields: vec![Field::new("f1", "ghost")],
        })
        .err()
        .unwrap();
        assert!(err.to_string().contains("unknown group ghost"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let defs = seeded();
        assert!(defs.add_group(Group::new("G", "again")).is_err());
        assert!(defs.add_field(Field::new("f1", "H")).is_err());
        assert_eq!(defs.field("f1").unwrap().group_id, "G");
    }

    #[test]
    fn load_reads_json_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = json!({
            "groups": [{"id": "G", "name": "content_flagging"}],
            "fields": [{"id": "f1", "group_id": "G", "name": "status"}]
        });
        write!(file, "{body}").unwrap();

        let defs = PropertyDefinitions::load(file.path()).unwrap();
        assert_eq!(defs.group_count(), 1);
        assert_eq!(defs.field_count(), 1);
        assert_eq!(defs.field("f1").unwrap().name.as_deref(), Some("status"));
    }

    #[test]
    fn load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = PropertyDefinitions::load(file.path()).err().unwrap();
        assert!(err.to_string().contains("parsing property definitions"));
    }
}
