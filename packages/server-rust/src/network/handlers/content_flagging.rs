//! Content flagging feature status endpoint.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;

/// Response of `GET /api/v4/content_flagging/teams/{team_id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamFlaggingStatus {
    pub team_id: String,
    pub enabled: bool,
}

/// Reports whether post flagging is available to members of a team.
pub async fn team_flagging_status_handler(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Json<TeamFlaggingStatus> {
    let enabled = state.content_flagging.team_post_flagging_enabled(&team_id);
    Json(TeamFlaggingStatus { team_id, enabled })
}
