//! The property patch pipeline.
//!
//! Processing is two-phase:
//!
//! 1. **Prepare**: resolve every field, bucket values by owning group,
//!    materialize each group and pick its permission handler. Any unknown
//!    field, unresolvable group or unregistered group name fails here,
//!    before a single handler has run.
//! 2. **Authorize**: run each group's handler on its own copy of the
//!    values. One failure fails the request and no group's result is
//!    returned.
//!
//! The pipeline does not persist anything; callers commit the returned
//! [`PatchResult`].

use std::sync::Arc;
use std::time::Instant;

use postprop_core::grouping::field_ids;
use postprop_core::{
    group_by_owner, GroupPatch, HandlerRegistry, PatchContext, PatchError, PatchResult,
    PermissionHandler, RawPatch,
};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info_span, warn, Instrument};

use super::config::{DispatchMode, PipelineConfig};
use crate::traits::{FieldRegistry, GroupRegistry};

/// A group patch waiting for its handler.
struct PendingGroup {
    patch: GroupPatch,
    handler: Arc<dyn PermissionHandler>,
}

/// Resolves, groups and authorizes raw property patches.
///
/// Holds no per-request state; one instance is shared by all requests.
pub struct PatchPipeline {
    fields: Arc<dyn FieldRegistry>,
    groups: Arc<dyn GroupRegistry>,
    handlers: Arc<HandlerRegistry>,
    config: PipelineConfig,
}

impl PatchPipeline {
    #[must_use]
    pub fn new(
        fields: Arc<dyn FieldRegistry>,
        groups: Arc<dyn GroupRegistry>,
        handlers: Arc<HandlerRegistry>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fields,
            groups,
            handlers,
            config,
        }
    }

    /// The handler registry this pipeline dispatches to.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Turns a raw patch into the approved, per-group patch.
    ///
    /// An empty patch is approved trivially without consulting any
    /// collaborator.
    ///
    /// # Errors
    ///
    /// Any [`PatchError`]; each one aborts the whole patch.
    pub async fn resolve(
        &self,
        ctx: &PatchContext,
        raw: RawPatch,
    ) -> Result<PatchResult, PatchError> {
        let span = info_span!(
            "property_patch",
            target_id = %ctx.target_id,
            requester_id = %ctx.requester_id,
            fields = raw.len(),
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let start = Instant::now();
            let result = self.resolve_inner(ctx, raw).await;
            let elapsed = start.elapsed();

            let outcome = match &result {
                Ok(_) => "ok",
                Err(e) => e.kind(),
            };

            #[allow(clippy::cast_possible_truncation)]
            let duration_ms = elapsed.as_millis() as u64;
            tracing::Span::current().record("duration_ms", duration_ms);
            tracing::Span::current().record("outcome", outcome);

            metrics::counter!("postprop_patch_requests_total", "outcome" => outcome).increment(1);
            metrics::histogram!("postprop_patch_duration_seconds").record(elapsed.as_secs_f64());

            debug!(duration_ms, outcome, "property patch resolved");
            result
        }
        .instrument(span)
        .await
    }

    async fn resolve_inner(
        &self,
        ctx: &PatchContext,
        raw: RawPatch,
    ) -> Result<PatchResult, PatchError> {
        if raw.is_empty() {
            return Ok(PatchResult::new());
        }
        let max = self.config.max_fields_per_patch;
        if raw.len() > max {
            return Err(PatchError::PatchTooLarge {
                count: raw.len(),
                max,
            });
        }

        let pending = self.prepare(ctx, raw).await?;
        self.authorize(ctx, pending).await
    }

    /// Phase one: everything that can fail without running a handler.
    async fn prepare(
        &self,
        ctx: &PatchContext,
        raw: RawPatch,
    ) -> Result<Vec<PendingGroup>, PatchError> {
        let ids = field_ids(&raw);
        let fields = self
            .fields
            .lookup_fields(&ctx.target_id, &ids)
            .await
            .map_err(PatchError::field_resolution)?;

        let grouped = group_by_owner(raw, &fields)?;

        let mut patches = Vec::with_capacity(grouped.len());
        for (group_id, values) in grouped {
            let group = match self.groups.lookup_group(&group_id).await {
                Ok(group) if group.id == group_id => group,
                Ok(group) => {
                    return Err(PatchError::group_resolution(
                        group_id.clone(),
                        anyhow::anyhow!("registry answered with group {}", group.id),
                    ))
                }
                Err(e) => return Err(PatchError::group_resolution(group_id, e)),
            };
            patches.push(GroupPatch { group, values });
        }

        patches
            .into_iter()
            .map(|patch| {
                let Some(handler) = self.handlers.get(&patch.group.name) else {
                    return Err(PatchError::UnknownPermissionGroup {
                        group_name: patch.group.name,
                    });
                };
                Ok(PendingGroup { patch, handler })
            })
            .collect()
    }

    /// Phase two: run handlers and collect the approved values.
    ///
    /// Every handler runs on its own task so a panic surfaces as
    /// [`PatchError::Internal`]. Sequential dispatch awaits each task before
    /// spawning the next, in group-ID order.
    async fn authorize(
        &self,
        ctx: &PatchContext,
        pending: Vec<PendingGroup>,
    ) -> Result<PatchResult, PatchError> {
        let sequential = self.config.dispatch == DispatchMode::Sequential;
        let mut tasks = JoinSet::new();
        let mut result = PatchResult::new();

        // Returning early drops `tasks`, which aborts every handler still running.
        for group in pending {
            let ctx = ctx.clone();
            tasks.spawn(async move { authorize_group(&ctx, group).await }.in_current_span());
            if sequential {
                if let Some(joined) = tasks.join_next().await {
                    result.insert(joined_group(joined)?);
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            result.insert(joined_group(joined)?);
        }
        Ok(result)
    }
}

fn joined_group(
    joined: Result<Result<GroupPatch, PatchError>, JoinError>,
) -> Result<GroupPatch, PatchError> {
    joined.map_err(|e| PatchError::Internal(format!("permission handler task failed: {e}")))?
}

async fn authorize_group(
    ctx: &PatchContext,
    pending: PendingGroup,
) -> Result<GroupPatch, PatchError> {
    let PendingGroup {
        patch: GroupPatch { group, values },
        handler,
    } = pending;

    match handler.authorize(ctx, &group.name, values).await {
        Ok(approved) => Ok(GroupPatch {
            group,
            values: approved,
        }),
        Err(source) => {
            warn!(
                group_id = %group.id,
                group_name = %group.name,
                status = source.status,
                "permission handler rejected property patch: {}",
                source.message
            );
            Err(PatchError::PermissionDenied {
                group_name: group.name,
                source,
            })
        }
    }
}
