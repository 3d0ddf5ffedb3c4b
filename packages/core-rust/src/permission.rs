//! Permission handler registry.
//!
//! Maps a property group *name* to the [`PermissionHandler`] enforcing that
//! group's policy. The registry is assembled once at startup through
//! [`HandlerRegistryBuilder`] and is immutable afterwards, so it can be
//! shared behind an `Arc` without locking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::PatchContext;
use crate::error::HandlerError;
use crate::traits::PermissionHandler;
use crate::types::PropertyValues;

/// Name of the property group holding content flagging (review) fields.
pub const CONTENT_FLAGGING_GROUP_NAME: &str = "content_flagging";

/// Placeholder policy that approves every value unchanged.
///
/// Used for groups whose real policy is not written yet. Registering this
/// stub, rather than leaving the group out, keeps "policy not implemented"
/// (patch approved as-is) distinct from "group not recognised"
/// (`UnknownPermissionGroup`).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityHandler;

#[async_trait]
impl PermissionHandler for IdentityHandler {
    async fn authorize(
        &self,
        ctx: &PatchContext,
        group_name: &str,
        values: PropertyValues,
    ) -> Result<PropertyValues, HandlerError> {
        debug!(
            target_id = %ctx.target_id,
            group_name,
            fields = values.len(),
            "identity permission handler approved patch unchanged"
        );
        Ok(values)
    }
}

/// Immutable group name -> handler table.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn PermissionHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// The registry used by the service: content flagging on the identity stub.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::builder()
            .register(CONTENT_FLAGGING_GROUP_NAME, IdentityHandler)
            .build()
    }

    /// Looks up the handler for a group name.
    #[must_use]
    pub fn get(&self, group_name: &str) -> Option<Arc<dyn PermissionHandler>> {
        self.handlers.get(group_name).cloned()
    }

    #[must_use]
    pub fn contains(&self, group_name: &str) -> bool {
        self.handlers.contains_key(group_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered group names, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("groups", &self.group_names())
            .finish()
    }
}

/// Append-only builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn PermissionHandler>>,
}

impl HandlerRegistryBuilder {
    /// Registers `handler` for `group_name`. A later registration for the
    /// same name replaces the earlier one.
    #[must_use]
    pub fn register<H>(self, group_name: impl Into<String>, handler: H) -> Self
    where
        H: PermissionHandler + 'static,
    {
        self.register_arc(group_name, Arc::new(handler))
    }

    /// Registers an already shared handler.
    #[must_use]
    pub fn register_arc(
        mut self,
        group_name: impl Into<String>,
        handler: Arc<dyn PermissionHandler>,
    ) -> Self {
        self.handlers.insert(group_name.into(), handler);
        self
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}
