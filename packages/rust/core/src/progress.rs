//! Progress callbacks for long summarization runs.

/// Progress callback for reporting pipeline status.
pub trait SummaryProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each generation call over a batch (1-based `current`).
    fn batch_progress(&self, current: usize, total: usize, detail: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl SummaryProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn batch_progress(&self, _current: usize, _total: usize, _detail: &str) {}
}
