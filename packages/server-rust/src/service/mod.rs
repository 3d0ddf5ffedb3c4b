//! Property patch processing.
//!
//! - [`pipeline`]: resolve -> group -> authorize for one raw patch
//! - [`config`]: pipeline tuning (dispatch mode, size limit)
//! - [`content_flagging`]: content flagging settings and feature status

pub mod config;
pub mod content_flagging;
pub mod pipeline;

pub use config::{DispatchMode, PipelineConfig};
pub use content_flagging::{ContentFlaggingSettings, ReviewerSettings, TeamReviewerSetting};
pub use pipeline::PatchPipeline;
