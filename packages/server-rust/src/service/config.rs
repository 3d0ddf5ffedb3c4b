/// How per-group permission handlers are scheduled within one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One task per group, joined before returning. The first failure to
    /// arrive wins and the remaining tasks are aborted.
    #[default]
    Concurrent,
    /// Groups run one after another in group ID order. The first failure
    /// stops the loop, which makes error reporting deterministic.
    Sequential,
}

/// Configuration for the property patch pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Handler scheduling strategy.
    pub dispatch: DispatchMode,
    /// Largest number of fields accepted in one patch.
    pub max_fields_per_patch: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Concurrent,
            max_fields_per_patch: 100,
        }
    }
}
