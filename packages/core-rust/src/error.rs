//! Error taxonomy for property patch resolution.
//!
//! Every variant aborts the whole request. Status codes are plain `u16`
//! HTTP equivalents so this crate stays free of any HTTP dependency.

/// Failure reported by a permission handler.
///
/// A 4xx or 5xx status is propagated verbatim to the caller; anything else
/// is reported as 500 so a rejection never reads as success.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct HandlerError {
    /// HTTP-equivalent status chosen by the handler.
    pub status: u16,
    /// Human-readable reason.
    pub message: String,
}

impl HandlerError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Convenience for the common 403 rejection.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }
}

/// Errors returned by the property patch pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("unknown property field: {field_id}")]
    UnknownField { field_id: String },

    #[error("failed to resolve property fields: {source}")]
    FieldResolutionFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to resolve property group {group_id}: {source}")]
    GroupResolutionFailed {
        group_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no permission handler registered for property group {group_name}")]
    UnknownPermissionGroup { group_name: String },

    #[error("permission denied for property group {group_name}: {source}")]
    PermissionDenied {
        group_name: String,
        #[source]
        source: HandlerError,
    },

    #[error("patch has {count} fields, at most {max} allowed")]
    PatchTooLarge { count: usize, max: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl PatchError {
    /// HTTP-equivalent status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownField { .. } => 404,
            Self::UnknownPermissionGroup { .. } | Self::PatchTooLarge { .. } => 400,
            Self::PermissionDenied { source, .. } if (400..600).contains(&source.status) => {
                source.status
            }
            Self::PermissionDenied { .. }
            | Self::FieldResolutionFailed { .. }
            | Self::GroupResolutionFailed { .. }
            | Self::Internal(_) => 500,
        }
    }

    /// Stable snake_case identifier of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownField { .. } => "unknown_field",
            Self::FieldResolutionFailed { .. } => "field_resolution_failed",
            Self::GroupResolutionFailed { .. } => "group_resolution_failed",
            Self::UnknownPermissionGroup { .. } => "unknown_permission_group",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::PatchTooLarge { .. } => "patch_too_large",
            Self::Internal(_) => "internal",
        }
    }

    /// The field ID, group ID or group name the caller should look at, if any.
    #[must_use]
    pub fn offending_id(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field_id } => Some(field_id),
            Self::GroupResolutionFailed { group_id, .. } => Some(group_id),
            Self::UnknownPermissionGroup { group_name }
            | Self::PermissionDenied { group_name, .. } => Some(group_name),
            Self::FieldResolutionFailed { .. } | Self::PatchTooLarge { .. } | Self::Internal(_) => {
                None
            }
        }
    }

    /// Wraps any collaborator error as a field lookup failure.
    pub fn field_resolution(source: impl Into<anyhow::Error>) -> Self {
        Self::FieldResolutionFailed {
            source: source.into(),
        }
    }

    /// Wraps any collaborator error as a group lookup failure.
    pub fn group_resolution(
        group_id: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::GroupResolutionFailed {
            group_id: group_id.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            PatchError::UnknownField {
                field_id: "f1".into()
            }
            .status(),
            404
        );
        assert_eq!(
            PatchError::UnknownPermissionGroup {
                group_name: "g".into()
            }
            .status(),
            400
        );
        assert_eq!(PatchError::group_resolution("g1", anyhow::anyhow!("boom")).status(), 500);
        assert_eq!(PatchError::field_resolution(anyhow::anyhow!("boom")).status(), 500);
        assert_eq!(PatchError::PatchTooLarge { count: 3, max: 2 }.status(), 400);
    }

    #[test]
    fn permission_denied_propagates_handler_status() {
        let err = PatchError::PermissionDenied {
            group_name: "content_flagging".into(),
            source: HandlerError::new(409, "already reviewed"),
        };
        assert_eq!(err.status(), 409);
        assert_eq!(err.kind(), "permission_denied");
        assert_eq!(err.offending_id(), Some("content_flagging"));
        assert!(err.to_string().contains("already reviewed"));
    }

    #[test]
    fn non_error_handler_status_becomes_500() {
        for status in [100, 200, 204, 302, 600, 0] {
            let err = PatchError::PermissionDenied {
                group_name: "content_flagging".into(),
                source: HandlerError::new(status, "bad status"),
            };
            assert_eq!(err.status(), 500, "handler status {status}");
        }
        let err = PatchError::PermissionDenied {
            group_name: "content_flagging".into(),
            source: HandlerError::new(503, "reviewer service down"),
        };
        assert_eq!(err.status(), 503);
    }

    #[test]
    fn offending_id_points_at_input() {
        let err = PatchError::UnknownField {
            field_id: "fX".into(),
        };
        assert_eq!(err.offending_id(), Some("fX"));
        assert_eq!(err.kind(), "unknown_field");

        let err = PatchError::group_resolution("g9", anyhow::anyhow!("missing"));
        assert_eq!(err.offending_id(), Some("g9"));
        assert!(PatchError::Internal("x".into()).offending_id().is_none());
    }

    #[test]
    fn forbidden_handler_error_is_403() {
        let err = HandlerError::forbidden("not a reviewer");
        assert_eq!(err.status, 403);
        assert_eq!(err.to_string(), "not a reviewer (status 403)");
    }
}
