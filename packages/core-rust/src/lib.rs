//! Post property patches: data model, grouping by owning group, and
//! per-group permission handlers.

pub mod context;
pub mod error;
pub mod grouping;
pub mod permission;
pub mod traits;
pub mod types;

pub use context::PatchContext;
pub use error::{HandlerError, PatchError};
pub use grouping::{group_by_owner, GroupedValues};
pub use permission::{
    HandlerRegistry, HandlerRegistryBuilder, IdentityHandler, CONTENT_FLAGGING_GROUP_NAME,
};
pub use traits::PermissionHandler;
pub use types::{Field, Group, GroupPatch, PatchResult, PropertyValues, RawPatch, RawValue};
