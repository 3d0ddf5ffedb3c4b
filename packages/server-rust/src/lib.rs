//! Post property patch server: permission-gated, grouped property patches
//! over HTTP.

pub mod network;
pub mod service;
pub mod storage;
pub mod traits;

pub use service::{DispatchMode, PatchPipeline, PipelineConfig};
pub use traits::{FieldRegistry, GroupRegistry, PropertyStore};
