//! Post property endpoints.
//!
//! `PATCH /api/v4/properties/posts/{post_id}` takes a JSON object of field
//! ID -> value, runs it through the [`PatchPipeline`](crate::service::PatchPipeline),
//! commits the approved result and answers with the approved values in the
//! same flat shape. Nothing is committed unless every group was approved.

use std::sync::LazyLock;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use postprop_core::{PatchContext, PropertyValues, RawPatch};
use regex::Regex;
use tracing::info;

use super::{ApiError, AppState, Requester};

static POST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9]+$").expect("post id pattern compiles"));

fn validate_post_id(post_id: &str) -> Result<(), ApiError> {
    if POST_ID.is_match(post_id) {
        Ok(())
    } else {
        Err(ApiError::InvalidTargetId(post_id.to_string()))
    }
}

/// Applies a property patch to a post.
pub async fn patch_post_properties_handler(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Requester(requester_id): Requester,
    body: Bytes,
) -> Result<Json<PropertyValues>, ApiError> {
    validate_post_id(&post_id)?;
    let raw: RawPatch =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    let ctx = PatchContext::new(post_id, requester_id);
    let approved = state.pipeline.resolve(&ctx, raw).await?;

    state
        .store
        .commit(&ctx.target_id, &approved)
        .await
        .map_err(ApiError::Store)?;

    info!(
        target_id = %ctx.target_id,
        requester_id = %ctx.requester_id,
        groups = approved.len(),
        fields = approved.field_count(),
        "post property patch applied"
    );
    Ok(Json(approved.flatten()))
}

/// Returns the stored property values of a post.
pub async fn get_post_properties_handler(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Requester(_requester_id): Requester,
) -> Result<Json<PropertyValues>, ApiError> {
    validate_post_id(&post_id)?;
    let values = state.store.values(&post_id).await.map_err(ApiError::Store)?;
    Ok(Json(values))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::routing::patch;
    use axum::Router;
    use postprop_core::{
        HandlerError, HandlerRegistry, IdentityHandler, PermissionHandler,
        CONTENT_FLAGGING_GROUP_NAME,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::network::handlers::test_support::{state_with, test_state};
    use crate::network::handlers::ErrorBody;

    const URI: &str = "/api/v4/properties/posts/post1";

    fn router(state: AppState) -> Router {
        Router::new()
            .route(
                "/api/v4/properties/posts/{post_id}",
                patch(patch_post_properties_handler).get(get_post_properties_handler),
            )
            .with_state(state)
    }

    fn patch_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PATCH)
            .uri(uri)
            .header("x-requester-id", "user1")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Rejects every patch with the given status.
    struct RejectingHandler(u16);

    #[async_trait]
    impl PermissionHandler for RejectingHandler {
        async fn authorize(
            &self,
            _ctx: &PatchContext,
            _group_name: &str,
            _values: PropertyValues,
        ) -> Result<PropertyValues, HandlerError> {
            Err(HandlerError::new(self.0, "requester cannot review this post"))
        }
    }

    #[tokio::test]
    async fn approved_patch_is_committed_and_echoed() {
        let state = test_state();
        let store = Arc::clone(&state.store);

        let (status, body) = send(state, patch_request(URI, r#"{"f1": "a", "f2": "b"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"f1": "a", "f2": "b"}));

        let stored = store.values("post1").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["f2"], json!("b"));
    }

    #[tokio::test]
    async fn get_returns_stored_values() {
        let state = test_state();
        let (status, _) = send(state.clone(), patch_request(URI, r#"{"f1": [1, 2]}"#)).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri(URI)
            .header("x-requester-id", "user2")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"f1": [1, 2]}));
    }

    #[tokio::test]
    async fn unknown_field_is_404_and_nothing_committed() {
        let state = test_state();
        let store = Arc::clone(&state.store);

        let (status, body) = send(state, patch_request(URI, r#"{"f1": "a", "fX": "b"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: ErrorBody = serde_json::from_value(body).unwrap();
        assert_eq!(body.kind, "unknown_field");
        assert_eq!(body.offending_id.as_deref(), Some("fX"));
        assert!(store.values("post1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unhandled_group_is_400() {
        let (status, body) = send(test_state(), patch_request(URI, r#"{"h1": 1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "unknown_permission_group");
        assert_eq!(body["offending_id"], "unhandled");
    }

    #[tokio::test]
    async fn rejected_group_blocks_other_groups() {
        let handlers = HandlerRegistry::builder()
            .register(CONTENT_FLAGGING_GROUP_NAME, IdentityHandler)
            .register("unhandled", RejectingHandler(403))
            .build();
        let state = state_with(handlers);
        let store = Arc::clone(&state.store);

        let (status, body) = send(state, patch_request(URI, r#"{"f1": "a", "h1": 1}"#)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "permission_denied");
        assert!(store.values("post1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejection_with_success_status_is_500() {
        let handlers = HandlerRegistry::builder()
            .register(CONTENT_FLAGGING_GROUP_NAME, RejectingHandler(200))
            .build();
        let state = state_with(handlers);
        let store = Arc::clone(&state.store);

        let (status, body) = send(state, patch_request(URI, r#"{"f1": "a"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "permission_denied");
        assert_eq!(body["status"], 500);
        assert!(store.values("post1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_object_is_accepted() {
        let (status, body) = send(test_state(), patch_request(URI, "{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        for bad in ["", "[1, 2]", "{\"f1\": }"] {
            let (status, body) = send(test_state(), patch_request(URI, bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {bad:?}");
            assert_eq!(body["kind"], "invalid_body");
        }
    }

    #[tokio::test]
    async fn invalid_post_id_is_400() {
        let (status, body) = send(
            test_state(),
            patch_request("/api/v4/properties/posts/not-valid", r#"{"f1": "a"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_target_id");
    }

    #[tokio::test]
    async fn missing_requester_is_401() {
        let request = Request::builder()
            .method(Method::PATCH)
            .uri(URI)
            .body(Body::from(r#"{"f1": "a"}"#))
            .unwrap();
        let (status, body) = send(test_state(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "missing_requester");
    }

    #[test]
    fn post_id_pattern() {
        assert!(validate_post_id("abc123XYZ").is_ok());
        assert!(validate_post_id("").is_err());
        assert!(validate_post_id("a/b").is_err());
        assert!(validate_post_id("a_b").is_err());
    }
}
