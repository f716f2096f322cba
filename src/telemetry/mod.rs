//! Telemetry data model
//!
//! Defines the decoded unit of sensor data and the per-session
//! sliding-window transform applied before fan-out:
//! - [`TelemetryEnvelope`]: one validated vibration-sensor reading
//! - [`SlidingWindow`]: fixed-length trailing buffer of recent samples

mod envelope;
mod window;

pub use envelope::{AxisReading, AxisSet, SampleField, TelemetryEnvelope};
pub use window::{SlidingWindow, DEFAULT_WINDOW_LEN};
