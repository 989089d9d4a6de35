//! Progress callbacks shared by the per-record stages.

/// Progress callback for a stage that walks records one by one.
pub trait StageProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Item-level progress within the current phase (1-based `current`).
    fn task_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op stage progress for headless/test usage.
pub struct SilentStageProgress;

impl StageProgress for SilentStageProgress {
    fn phase(&self, _name: &str) {}
    fn task_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}
