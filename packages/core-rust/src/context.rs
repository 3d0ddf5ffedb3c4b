/// Identity of a single patch request: what is being edited, and by whom.
/// Threaded through field resolution and every permission handler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchContext {
    /// Entity being patched (a post ID).
    pub target_id: String,
    /// Acting principal, as authenticated by the host.
    pub requester_id: String,
}

impl PatchContext {
    #[must_use]
    pub fn new(target_id: impl Into<String>, requester_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            requester_id: requester_id.into(),
        }
    }
}
