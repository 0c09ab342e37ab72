//! Per-operation statistics accumulation.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Accumulated measurements for one named operation.
///
/// A logger either tracks elapsed time only, or elapsed time plus a byte
/// volume. Measurements alternate strictly: every [`start`](Self::start)
/// is closed by exactly one stop before the next start.
#[derive(Debug, Clone)]
pub struct StatLogger {
    name: String,
    tracks_bytes: bool,
    count: u64,
    sum_time: f64,
    sum_time_sq: f64,
    sum_bytes: f64,
    sum_bytes_sq: f64,
    in_flight: Option<Instant>,
}

impl StatLogger {
    pub(crate) fn new(name: String, tracks_bytes: bool) -> Self {
        Self {
            name,
            tracks_bytes,
            count: 0,
            sum_time: 0.0,
            sum_time_sq: 0.0,
            sum_bytes: 0.0,
            sum_bytes_sq: 0.0,
            in_flight: None,
        }
    }

    /// Name this logger was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this logger accumulates byte volumes alongside time.
    pub fn tracks_bytes(&self) -> bool {
        self.tracks_bytes
    }

    /// Number of recorded operations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Open a measurement window at the current instant.
    ///
    /// # Panics
    ///
    /// Panics if a measurement is already in flight: starts and stops must
    /// alternate.
    pub fn start(&mut self) {
        assert!(
            self.in_flight.is_none(),
            "logger `{}`: start() while a measurement is in flight",
            self.name
        );
        self.in_flight = Some(Instant::now());
    }

    /// Close the open measurement window, attributing it to `repetitions`
    /// operations.
    ///
    /// # Panics
    ///
    /// Panics if no measurement is in flight.
    pub fn stop_time(&mut self, repetitions: u64) {
        let elapsed = self.take_elapsed();
        self.count += repetitions;
        self.sum_time += elapsed;
        self.sum_time_sq += elapsed * elapsed;
    }

    /// Close the open measurement window as one operation that moved
    /// `bytes` bytes.
    ///
    /// # Panics
    ///
    /// Panics if no measurement is in flight, or if this logger does not
    /// track bytes.
    pub fn stop_bytes(&mut self, bytes: u64) {
        assert!(
            self.tracks_bytes,
            "logger `{}`: stop_bytes() on a time-only logger",
            self.name
        );
        let elapsed = self.take_elapsed();
        let bytes = bytes as f64;
        self.count += 1;
        self.sum_time += elapsed;
        self.sum_time_sq += elapsed * elapsed;
        self.sum_bytes += bytes;
        self.sum_bytes_sq += bytes * bytes;
    }

    fn take_elapsed(&mut self) -> f64 {
        let started = self
            .in_flight
            .take()
            .unwrap_or_else(|| panic!("logger `{}`: stop without start", self.name));
        started.elapsed().as_secs_f64()
    }

    /// Derived aggregate view of this logger.
    pub fn summary(&self) -> StatSummary {
        let (sum_bytes, sum_bytes_sq) = if self.tracks_bytes {
            (Some(self.sum_bytes), Some(self.sum_bytes_sq))
        } else {
            (None, None)
        };
        StatSummary {
            count: self.count,
            sum_time: self.sum_time,
            sum_time_sq: self.sum_time_sq,
            avg_time: mean(self.sum_time, self.count),
            stddev_time: stddev(self.sum_time, self.sum_time_sq, self.count),
            sum_bytes,
            sum_bytes_sq,
            avg_bytes: sum_bytes.map(|s| mean(s, self.count)),
            stddev_bytes: sum_bytes_sq
                .map(|sq| stddev(self.sum_bytes, sq, self.count)),
        }
    }
}

/// Serializable aggregate record for one logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Number of recorded operations.
    pub count: u64,
    /// Total elapsed seconds across all measurements.
    pub sum_time: f64,
    /// Sum of squared elapsed seconds.
    pub sum_time_sq: f64,
    /// Mean elapsed seconds per operation (0 when count is 0).
    pub avg_time: f64,
    /// Population standard deviation of elapsed seconds.
    pub stddev_time: f64,
    /// Total bytes, present only for byte-tracking loggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_bytes: Option<f64>,
    /// Sum of squared byte counts, present only for byte-tracking loggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_bytes_sq: Option<f64>,
    /// Mean bytes per operation, present only for byte-tracking loggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_bytes: Option<f64>,
    /// Population standard deviation of bytes per operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev_bytes: Option<f64>,
}

fn mean(sum: f64, count: u64) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// `sqrt(max(0, count * sum_sq - sum^2)) / count`.
///
/// The clamp guards against floating-point rounding pushing the radicand
/// slightly negative when the true variance is ~0.
fn stddev(sum: f64, sum_sq: f64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (n * sum_sq - sum * sum).max(0.0).sqrt() / n
}
