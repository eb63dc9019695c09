//! Progress bars for batch runs.
//!
//! Bars are hidden in log-only mode; long phases then report through
//! [`log_progress`] instead, one line per interval.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set once from `--log-only` before any bar is created
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// e.g., 42.0s, 3.5m
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress bar for a phase with a known number of steps.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
                .unwrap()
                .progress_chars("=> "),
        );
    }
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for phases without a step count (FTS rebuild, VACUUM).
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg} {spinner} [{elapsed_precise}]")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb.set_message(msg.to_string());
    pb
}

/// Whether step `current` of `total` should be reported at this `interval`.
pub fn is_report_step(current: u64, total: u64, interval: u64) -> bool {
    current == total || (interval > 0 && current % interval == 0)
}

/// `[phase] n/total (pct%)` line, only in log-only mode.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && total > 0 && is_report_step(current, total, interval) {
        let pct = 100.0 * current as f64 / total as f64;
        info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(4200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_log_only_hides_bars() {
        set_log_only(true);
        assert!(create_progress_bar(10, "Matching tracks").is_hidden());
        assert!(create_spinner("Building FTS index").is_hidden());
        set_log_only(false);
    }

    #[test]
    fn test_report_steps() {
        assert!(is_report_step(100, 250, 100));
        assert!(is_report_step(250, 250, 100));
        assert!(!is_report_step(150, 250, 100));
        // Zero interval reports only the final step
        assert!(!is_report_step(5, 10, 0));
        assert!(is_report_step(10, 10, 0));
    }
}
