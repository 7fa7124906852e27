//! Clock and timestamp utilities.
//!
//! Booth sessions are anchored to a monotonic start instant for log
//! durations, and to wall-clock time for captions and file names.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};

/// A session clock with a monotonic epoch and the matching wall time.
#[derive(Debug, Clone)]
pub struct SessionClock {
    epoch: Instant,
    epoch_wall: DateTime<Utc>,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    /// Time elapsed since the clock started.
    pub fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    /// Seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at start, RFC 3339.
    pub fn epoch_wall(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }
}

/// Milliseconds since the Unix epoch, used as the artifact file suffix.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Local calendar date (`YYYY-MM-DD`) for the default caption.
pub fn caption_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Compose an artifact file name from a prefix and a millisecond stamp.
pub fn artifact_file_name(prefix: &str, millis: i64) -> String {
    format!("{prefix}-{millis}.png")
}
