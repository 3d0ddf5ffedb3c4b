use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use postprop_core::{Field, Group, PatchResult, PropertyValues};

/// Source of property field declarations.
/// Implementations: in-memory (tests, dev server); a database-backed registry lives in the host.
#[async_trait]
pub trait FieldRegistry: Send + Sync {
    /// Resolve a batch of field IDs in the context of `target_id`.
    ///
    /// IDs without a declaration are simply absent from the returned map;
    /// an `Err` means the registry itself failed.
    async fn lookup_fields(
        &self,
        target_id: &str,
        field_ids: &BTreeSet<String>,
    ) -> anyhow::Result<HashMap<String, Field>>;
}

/// Source of property group metadata.
#[async_trait]
pub trait GroupRegistry: Send + Sync {
    /// Fetch one group by ID. A missing group is an error.
    async fn lookup_group(&self, group_id: &str) -> anyhow::Result<Group>;
}

/// Persistence for approved property values.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Commit every group of an approved patch for `target_id`, all or nothing.
    async fn commit(&self, target_id: &str, patch: &PatchResult) -> anyhow::Result<()>;

    /// Current values stored for `target_id` (empty if none).
    async fn values(&self, target_id: &str) -> anyhow::Result<PropertyValues>;
}
