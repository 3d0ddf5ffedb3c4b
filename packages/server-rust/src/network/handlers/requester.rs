//! Requester identity extraction.
//!
//! Authentication happens in front of this service; the session layer
//! forwards the authenticated user ID in a configurable header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::{ApiError, AppState};

/// ID of the authenticated principal making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(pub String);

impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = state.config.requester_header.as_str();
        parts
            .headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Self(v.to_string()))
            .ok_or_else(|| ApiError::MissingRequester(header.to_string()))
    }
}
