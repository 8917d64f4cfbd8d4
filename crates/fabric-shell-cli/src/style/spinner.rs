//! Spinner helpers using indicatif.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Starts a spinner on stderr. indicatif hides it when stderr is not a terminal.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style.tick_strings(TICKS));
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Clears the spinner and reports success on stdout.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    super::print_success(msg);
}

/// Clears the spinner and reports failure on stderr.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    super::print_error(msg);
}
