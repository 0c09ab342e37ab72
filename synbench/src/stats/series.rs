//! Sparse per-frame time series.

use std::collections::BTreeMap;

/// Values recorded against frame indices, kept sparse until serialization.
///
/// Samples recorded while the same frame is open accumulate; frames with no
/// samples materialize as zero when the series is densified.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    name: String,
    samples: BTreeMap<usize, f64>,
    recorded: u64,
}

impl TimeSeries {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            samples: BTreeMap::new(),
            recorded: 0,
        }
    }

    /// Name this series was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of recorded values (not distinct frames).
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Add `value` to the accumulator for `frame`.
    pub(crate) fn record(&mut self, frame: usize, value: f64) {
        *self.samples.entry(frame).or_insert(0.0) += value;
        self.recorded += 1;
    }

    /// Scatter the sparse samples into a dense array of `frames` positions.
    ///
    /// Positions with no sample default to zero; samples recorded against a
    /// frame index at or beyond `frames` (an unclosed frame) are dropped.
    pub fn dense(&self, frames: usize) -> Vec<f64> {
        let mut out = vec![0.0; frames];
        for (&frame, &value) in &self.samples {
            if frame < frames {
                out[frame] = value;
            }
        }
        out
    }
}
