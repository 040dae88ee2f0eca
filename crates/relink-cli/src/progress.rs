use indicatif::{ProgressBar, ProgressStyle};
use relink_core::ProgressReporter;
use std::sync::Mutex;

/// CLI progress reporter using an indicatif bar per target: the row
/// count is known as soon as the target's rows are fetched.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_target_start(&self, table: &str, rows: usize) {
        let pb = ProgressBar::new(rows as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {pos}/{len} rows ({eta} remaining)",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(format!("Auditing {}", table));
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_row(&self, index: usize, _total: usize) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(index as u64);
        }
    }

    fn on_target_complete(&self, table: &str) {
        self.finish_bar();
        eprintln!("  \x1b[32m✓\x1b[0m {} audited", table);
    }
}
