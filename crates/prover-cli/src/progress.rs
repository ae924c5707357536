use indicatif::{ProgressBar, ProgressStyle};
use prover_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

/// Spinner shown while the prover runs.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_invalidated(&self, _file_id: i64, findings: usize, summaries: usize) {
        if findings + summaries > 0 {
            eprintln!(
                "  \x1b[33m•\x1b[0m Superseded {} findings and {} summaries",
                findings, summaries
            );
        }
    }

    fn on_tool_start(&self, file_name: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(format!("Proving {}...", file_name));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_tool_complete(&self, success: bool, duration_secs: f64) {
        self.finish_bar();
        if success {
            eprintln!("  \x1b[32m✓\x1b[0m Prover finished in {:.2}s", duration_secs);
        } else {
            eprintln!("  \x1b[31m✗\x1b[0m Prover failed after {:.2}s", duration_secs);
        }
    }

    fn on_persisted(&self, findings: usize, generation: i64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Recorded {} findings as run #{}",
            findings, generation
        );
    }
}
