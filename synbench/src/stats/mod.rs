//! Statistics registry: named counters, timers, and per-frame time series.
//!
//! The registry is the measurement side of the harness. Kernels look up
//! loggers by name and record into them; the execution driver opens one
//! measurement window per frame and closes it at the frame boundary, so the
//! recorded frame durations partition total elapsed time into contiguous,
//! non-overlapping intervals.
//!
//! A [`StatsRegistry`] is an owned value inside the run context — never a
//! process-wide global. Constructing a new one is the only way to obtain a
//! clean instance, which keeps independent runs (and tests) isolated
//! without a manual reset step.
//!
//! Misuse of the measurement contract (duplicate registration, unbalanced
//! start/stop, the wrong logger kind) is a programming error and panics;
//! it is deliberately not part of the recoverable error taxonomy.

mod logger;
mod series;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::time::Instant;

pub use logger::{StatLogger, StatSummary};
pub use series::TimeSeries;

use serde::{Deserialize, Serialize};

/// Name of the implicit series carrying closed-frame durations.
pub const DURATIONS_SERIES: &str = "durations";

/// Copyable handle to a registered [`StatLogger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatId(usize);

/// Copyable handle to a registered [`TimeSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(usize);

/// Process-local store of loggers, time series, and frame history.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    loggers: Vec<StatLogger>,
    logger_names: HashMap<String, StatId>,
    series: Vec<TimeSeries>,
    series_names: HashMap<String, SeriesId>,
    frame_durations: Vec<f64>,
    window_start: Option<Instant>,
}

impl StatsRegistry {
    /// A fresh, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a time-only logger under a unique name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered: duplicate registration is a
    /// programming error. Use [`timer`](Self::timer) for get-or-create.
    pub fn register_timer(&mut self, name: &str) -> StatId {
        self.register(name, false)
    }

    /// Register a time-and-bytes logger under a unique name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered. Use
    /// [`volume`](Self::volume) for get-or-create.
    pub fn register_volume(&mut self, name: &str) -> StatId {
        self.register(name, true)
    }

    fn register(&mut self, name: &str, tracks_bytes: bool) -> StatId {
        assert!(
            !self.logger_names.contains_key(name),
            "logger `{name}` registered twice"
        );
        let id = StatId(self.loggers.len());
        self.loggers.push(StatLogger::new(name.to_string(), tracks_bytes));
        self.logger_names.insert(name.to_string(), id);
        id
    }

    /// Look up a time-only logger by name, registering it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `name` exists but tracks bytes.
    pub fn timer(&mut self, name: &str) -> StatId {
        match self.lookup(name) {
            Some(id) => {
                assert!(
                    !self.loggers[id.0].tracks_bytes(),
                    "logger `{name}` exists but tracks bytes"
                );
                id
            }
            None => self.register_timer(name),
        }
    }

    /// Look up a time-and-bytes logger by name, registering it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `name` exists but is time-only.
    pub fn volume(&mut self, name: &str) -> StatId {
        match self.lookup(name) {
            Some(id) => {
                assert!(
                    self.loggers[id.0].tracks_bytes(),
                    "logger `{name}` exists but is time-only"
                );
                id
            }
            None => self.register_volume(name),
        }
    }

    /// Handle for an already-registered logger, if any.
    pub fn lookup(&self, name: &str) -> Option<StatId> {
        self.logger_names.get(name).copied()
    }

    /// Open a measurement window on `id` at the current instant.
    pub fn start(&mut self, id: StatId) {
        self.loggers[id.0].start();
    }

    /// Close the window on `id`, attributing it to `repetitions` operations.
    pub fn stop_time(&mut self, id: StatId, repetitions: u64) {
        self.loggers[id.0].stop_time(repetitions);
    }

    /// Close the window on `id` as one operation moving `bytes` bytes.
    pub fn stop_bytes(&mut self, id: StatId, bytes: u64) {
        self.loggers[id.0].stop_bytes(bytes);
    }

    /// Aggregate view of one logger.
    pub fn summary(&self, id: StatId) -> StatSummary {
        self.loggers[id.0].summary()
    }

    /// Look up a time series by name, registering it on first use.
    ///
    /// # Panics
    ///
    /// Panics if `name` is the reserved [`DURATIONS_SERIES`] name.
    pub fn series(&mut self, name: &str) -> SeriesId {
        assert!(
            name != DURATIONS_SERIES,
            "series name `{DURATIONS_SERIES}` is reserved for frame durations"
        );
        match self.series_names.get(name) {
            Some(&id) => id,
            None => {
                let id = SeriesId(self.series.len());
                self.series.push(TimeSeries::new(name.to_string()));
                self.series_names.insert(name.to_string(), id);
                id
            }
        }
    }

    /// Add `value` to `id`'s accumulator for the currently open frame.
    ///
    /// Multiple samples for one series within the same open frame sum.
    pub fn add_sample(&mut self, id: SeriesId, value: f64) {
        let frame = self.frame_durations.len();
        self.series[id.0].record(frame, value);
    }

    /// Mark the start of the first frame.
    ///
    /// # Panics
    ///
    /// Panics if a window is already open.
    pub fn start_window(&mut self) {
        assert!(
            self.window_start.is_none(),
            "time-series window is already open"
        );
        self.window_start = Some(Instant::now());
    }

    /// Close the current frame: append its duration to the frame history
    /// and immediately re-arm the window at the boundary just closed, so
    /// consecutive durations neither gap nor overlap.
    ///
    /// Returns the closed frame's duration in seconds.
    ///
    /// # Panics
    ///
    /// Panics if no window is open.
    pub fn close_chunk(&mut self) -> f64 {
        let boundary = Instant::now();
        let started = self
            .window_start
            .replace(boundary)
            .expect("close_chunk without an open window");
        let duration = (boundary - started).as_secs_f64();
        self.frame_durations.push(duration);
        duration
    }

    /// Number of frames closed so far.
    pub fn frames_closed(&self) -> usize {
        self.frame_durations.len()
    }

    /// Serializable snapshot: every logger's aggregates plus every series
    /// densified to the closed-frame count, including the implicit
    /// `"durations"` series.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let stats = self
            .loggers
            .iter()
            .map(|logger| (logger.name().to_string(), logger.summary()))
            .collect();
        let frames = self.frame_durations.len();
        let mut time_series: BTreeMap<String, Vec<f64>> = self
            .series
            .iter()
            .map(|series| (series.name().to_string(), series.dense(frames)))
            .collect();
        time_series.insert(DURATIONS_SERIES.to_string(), self.frame_durations.clone());
        let samples: u64 = self.series.iter().map(TimeSeries::recorded).sum();
        tracing::debug!(
            loggers = self.loggers.len(),
            series = self.series.len(),
            samples,
            frames,
            "registry snapshot taken"
        );
        RegistrySnapshot { stats, time_series }
    }
}

/// Serialized form of a registry: the `stats` and `time_series` sections of
/// a per-rank report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Aggregate fields per logger name.
    pub stats: BTreeMap<String, StatSummary>,
    /// Dense per-frame value arrays per series name.
    pub time_series: BTreeMap<String, Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn get_or_create_returns_the_same_handle() {
        let mut registry = StatsRegistry::new();
        let a = registry.volume("write");
        let b = registry.volume("write");
        assert_eq!(a, b);
        registry.start(a);
        registry.stop_bytes(b, 100);
        assert_eq!(registry.summary(a).count, 1);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_registration_is_a_bug() {
        let mut registry = StatsRegistry::new();
        registry.register_timer("burn");
        registry.register_timer("burn");
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn durations_series_name_is_reserved() {
        let mut registry = StatsRegistry::new();
        registry.series(DURATIONS_SERIES);
    }

    #[test]
    fn chunks_partition_elapsed_time() {
        let mut registry = StatsRegistry::new();
        registry.start_window();
        let mut durations = Vec::new();
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(5));
            durations.push(registry.close_chunk());
        }
        assert_eq!(registry.frames_closed(), 3);
        for d in &durations {
            assert!(*d >= 0.004, "chunk shorter than its sleep: {d}");
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.time_series[DURATIONS_SERIES], durations);
    }

    #[test]
    fn samples_land_in_the_open_frame() {
        let mut registry = StatsRegistry::new();
        registry.start_window();
        let reads = registry.series("reads");
        registry.add_sample(reads, 4.0);
        registry.add_sample(reads, 6.0); // same frame: accumulates
        registry.close_chunk();
        registry.close_chunk();
        registry.add_sample(reads, 1.0);
        registry.close_chunk();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.time_series["reads"], vec![10.0, 0.0, 1.0]);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut registry = StatsRegistry::new();
        let id = registry.volume("io");
        registry.start(id);
        registry.stop_bytes(id, 512);
        registry.start_window();
        // Values like this one perturb under lossy f64 parsing; the
        // coordinator re-parses every remote snapshot, so the round trip
        // must be bit-exact for arbitrary measured sums.
        let jitter = registry.series("jitter");
        registry.add_sample(jitter, 1.764e-15);
        registry.close_chunk();
        let snapshot = registry.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
