//! Progress bar for membership passes

use indicatif::{ProgressBar, ProgressStyle};
use membership::{LogProgress, OperationKind, OperationOutcome, ProgressCallback};
use std::io::{self, IsTerminal};

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Progress bar fed from the executor's worker threads
pub struct BarProgress {
    bar: ProgressBar,
}

/// Progress reporter for a sync run
///
/// A bar when stderr is a terminal, log lines otherwise or with `--quiet`.
pub fn reporter(quiet: bool) -> Box<dyn ProgressCallback> {
    if quiet || !io::stderr().is_terminal() {
        Box::new(LogProgress)
    } else {
        Box::new(BarProgress::new())
    }
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .map_or_else(|_| ProgressStyle::default_bar(), |s| s.progress_chars("=>-"));
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&self, count: usize) {
        self.bar.reset();
        self.bar.set_length(count as u64);
        self.bar.set_message("Applying");
    }

    fn on_operation_start(&self, kind: OperationKind, member_id: &str) {
        log::debug!("Starting {kind} {member_id}");
    }

    fn on_operation_complete(&self, outcome: &OperationOutcome) {
        let symbol = if outcome.is_success() { "✓" } else { "✗" };
        self.bar
            .set_message(format!("{symbol} {} {}", outcome.kind, outcome.member_id));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self) {
        self.bar.finish_and_clear();
    }
}
