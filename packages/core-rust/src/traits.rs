use async_trait::async_trait;

use crate::context::PatchContext;
use crate::error::HandlerError;
use crate::types::PropertyValues;

/// Authorization policy for the fields of one property group.
///
/// Registered once per group name. A handler receives its own copy of the
/// group's pending values and returns the set it approves: it may drop
/// fields (veto), rewrite values, or add fields. Added fields must already
/// be declared in the field registry, otherwise the value store rejects the
/// commit.
///
/// Handlers for different groups may run concurrently and must not assume
/// any ordering relative to each other.
#[async_trait]
pub trait PermissionHandler: Send + Sync {
    /// Approve, rewrite, or reject the pending values for `group_name`.
    async fn authorize(
        &self,
        ctx: &PatchContext,
        group_name: &str,
        values: PropertyValues,
    ) -> Result<PropertyValues, HandlerError>;
}
