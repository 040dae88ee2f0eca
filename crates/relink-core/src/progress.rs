/// Trait for reporting audit progress.
///
/// CLI implements with indicatif; tests use SilentReporter.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_target_start(&self, _table: &str, _rows: usize) {}
    fn on_row(&self, _index: usize, _total: usize) {}
    fn on_target_complete(&self, _table: &str) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
