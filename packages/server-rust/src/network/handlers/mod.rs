//! HTTP handler definitions for the property patch server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for building the router.

pub mod content_flagging;
pub mod error;
pub mod health;
pub mod post_properties;
pub mod requester;

pub use content_flagging::team_flagging_status_handler;
pub use error::{ApiError, ErrorBody};
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use post_properties::{get_post_properties_handler, patch_post_properties_handler};
pub use requester::Requester;

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::{ContentFlaggingSettings, PatchPipeline};
use crate::traits::PropertyStore;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references to shared resources so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Resolves and authorizes incoming patches.
    pub pipeline: Arc<PatchPipeline>,
    /// Receives approved patches.
    pub store: Arc<dyn PropertyStore>,
    /// Content flagging switches and reviewer assignment.
    pub content_flagging: Arc<ContentFlaggingSettings>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Network configuration (bind address, TLS, requester header).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
