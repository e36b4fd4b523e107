use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Terminal spinner reporting where a run currently is.
pub struct ProgressTracker {
    pb: ProgressBar,
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            pb.set_style(style);
        }

        Self {
            pb,
            start_time: Instant::now(),
        }
    }

    /// A tracker that never draws, for tests and non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
            start_time: Instant::now(),
        }
    }

    pub fn start(&self, message: &str) {
        self.pb.set_message(message.to_string());
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    pub fn log_page(&self, page: usize, cards: usize) {
        self.pb
            .set_message(format!("Results page {}: {} profiles found", page, cards));
    }

    pub fn log_profile(&self, name: &str, done: usize) {
        self.pb
            .set_message(format!("Reading profile: {} ({} collected)", name, done));
    }

    pub fn complete(&self, message: &str) {
        self.pb.finish_with_message(format!(
            "{} in {:.2} seconds",
            message,
            self.start_time.elapsed().as_secs_f32()
        ));
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
