//! Error responses for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use postprop_core::PatchError;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable snake_case error kind.
    pub kind: String,
    pub message: String,
    /// HTTP status, repeated in the body for clients that lose it.
    pub status: u16,
    /// Field ID, group ID or group name the error refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offending_id: Option<String>,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid post id: {0}")]
    InvalidTargetId(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("missing requester identity header {0}")]
    MissingRequester(String),

    #[error("failed to store property values: {0}")]
    Store(#[source] anyhow::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidTargetId(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingRequester(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Patch(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTargetId(_) => "invalid_target_id",
            Self::InvalidBody(_) => "invalid_body",
            Self::MissingRequester(_) => "missing_requester",
            Self::Store(_) => "store_failed",
            Self::Patch(e) => e.kind(),
        }
    }

    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let offending_id = match self {
            Self::InvalidTargetId(id) => Some(id.clone()),
            Self::Patch(e) => e.offending_id().map(ToString::to_string),
            Self::InvalidBody(_) | Self::MissingRequester(_) | Self::Store(_) => None,
        };
        ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
            status: self.status().as_u16(),
            offending_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "request failed: {self:#}");
        } else {
            debug!(kind = self.kind(), "request rejected: {self}");
        }
        (status, Json(self.body())).into_response()
    }
}
