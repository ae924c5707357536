/// Trait for reporting the phases of a verification run.
///
/// The CLI implements it with an indicatif spinner. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_invalidated(&self, _file_id: i64, _findings: usize, _summaries: usize) {}
    fn on_tool_start(&self, _file_name: &str) {}
    fn on_tool_complete(&self, _success: bool, _duration_secs: f64) {}
    fn on_persisted(&self, _findings: usize, _generation: i64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
