use crate::client::constants::PROGRESS_TICK_INTERVAL_MS;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal progress display for a measurement run.
///
/// Fixed-duration runs get a bar over elapsed seconds, continuous runs a
/// spinner. Interim reports print through [`ProgressTracker::suspend`] so the
/// bar never tears.
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Bar counting elapsed seconds toward the configured duration.
    pub fn for_duration(seconds: u64, quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new(seconds);
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} {bar:40.cyan/blue} {pos:>4}/{len}s {msg}")
        {
            bar.set_style(style.progress_chars("█░"));
        }
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_INTERVAL_MS));
        Self { bar }
    }

    /// Spinner for continuous-mode runs with no deadline.
    pub fn continuous(quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_INTERVAL_MS));
        Self { bar }
    }

    pub fn set_elapsed(&self, seconds: u64) {
        self.bar.set_position(seconds);
    }

    pub fn set_message(&self, message: String) {
        self.bar.set_message(message);
    }

    /// Run `f` with the bar temporarily cleared from the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
