//! In-memory [`PropertyStore`] for approved property values.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::RwLock;
use postprop_core::{PatchResult, PropertyValues};
use tracing::debug;

use super::definitions::PropertyDefinitions;
use crate::traits::PropertyStore;

/// Target ID -> current property values, guarded by a single lock.
///
/// A commit is validated in full before anything is written, and the write
/// happens under one lock acquisition, so readers never observe a
/// partially applied patch.
pub struct InMemoryPropertyStore {
    definitions: Arc<PropertyDefinitions>,
    values: RwLock<HashMap<String, PropertyValues>>,
}

impl InMemoryPropertyStore {
    #[must_use]
    pub fn new(definitions: Arc<PropertyDefinitions>) -> Self {
        Self {
            definitions,
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Number of targets with at least one stored value.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.values.read().len()
    }

    /// Rejects fields a handler added that are undeclared or filed under
    /// a group other than their owner.
    fn validate(&self, patch: &PatchResult) -> anyhow::Result<()> {
        for (group_id, group_patch) in patch.iter() {
            for field_id in group_patch.values.keys() {
                let Some(field) = self.definitions.field(field_id) else {
                    bail!("cannot store undeclared property field {field_id}");
                };
                if &field.group_id != group_id {
                    bail!(
                        "property field {field_id} belongs to group {}, not {group_id}",
                        field.group_id
                    );
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for InMemoryPropertyStore {
    async fn commit(&self, target_id: &str, patch: &PatchResult) -> anyhow::Result<()> {
        self.validate(patch)?;
        if patch.field_count() == 0 {
            return Ok(());
        }

        let mut values = self.values.write();
        let stored = values.entry(target_id.to_string()).or_default();
        stored.extend(patch.flatten());
        debug!(target_id, fields = patch.field_count(), "committed property patch");
        Ok(())
    }

    async fn values(&self, target_id: &str) -> anyhow::Result<PropertyValues> {
        Ok(self.values.read().get(target_id).cloned().unwrap_or_default())
    }
}
