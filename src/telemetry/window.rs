//! Sliding window transform
//!
//! Each client session folds its envelope stream into a fixed-length
//! trailing window per axis: every update discards the oldest sample
//! and appends the newest, so the window always holds the N most
//! recent samples, oldest first. Fresh windows start zero-filled, so
//! clients see a full-length frame from the first update.
//!
//! The window is owned by exactly one session and never shared, so no
//! synchronization is required.

use std::collections::VecDeque;

use super::envelope::{SampleField, TelemetryEnvelope};

/// Window length matching the sensor's native frame size
pub const DEFAULT_WINDOW_LEN: usize = 50;

/// Fixed-length trailing buffer of the most recent samples per axis
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    field: SampleField,
    x: VecDeque<f64>,
    y: VecDeque<f64>,
    z: VecDeque<f64>,
}

impl SlidingWindow {
    /// Create a zero-filled window of `len` samples per axis
    pub fn new(len: usize, field: SampleField) -> Self {
        Self {
            field,
            x: zero_filled(len),
            y: zero_filled(len),
            z: zero_filled(len),
        }
    }

    /// Fold one envelope into the window
    ///
    /// Drops the oldest sample on each axis and appends the envelope's
    /// configured measurement. Length is invariant across updates.
    pub fn update(&mut self, envelope: &TelemetryEnvelope) {
        shift_append(&mut self.x, envelope.data.x.sample(self.field));
        shift_append(&mut self.y, envelope.data.y.sample(self.field));
        shift_append(&mut self.z, envelope.data.z.sample(self.field));
    }

    /// Samples per axis
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// X-axis window, oldest first
    pub fn x(&self) -> Vec<f64> {
        self.x.iter().copied().collect()
    }

    /// Y-axis window, oldest first
    pub fn y(&self) -> Vec<f64> {
        self.y.iter().copied().collect()
    }

    /// Z-axis window, oldest first
    pub fn z(&self) -> Vec<f64> {
        self.z.iter().copied().collect()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LEN, SampleField::default())
    }
}

fn zero_filled(len: usize) -> VecDeque<f64> {
    std::iter::repeat(0.0).take(len).collect()
}

fn shift_append(buf: &mut VecDeque<f64>, value: f64) {
    buf.pop_front();
    buf.push_back(value);
}
