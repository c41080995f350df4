//! Frame clock.
//!
//! Fed from the display's monotonic `time()` in seconds rather than reading `Instant`
//! itself, so whole frames can run against a fake clock.

use std::time::Duration;

#[derive(Debug, Default)]
pub struct Time {
    last_frame: Option<f64>,
    delta: Duration,
    frame_count: u64,
}

impl Time {
    /// The first `update` yields a zero delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a frame at `now` seconds. A timestamp older than the previous one counts
    /// as a zero-length frame.
    pub fn update(&mut self, now: f64) {
        let last = self.last_frame.unwrap_or(now);
        self.delta = Duration::from_secs_f64((now - last).max(0.0));
        self.last_frame = Some(now.max(last));
        self.frame_count += 1;
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
