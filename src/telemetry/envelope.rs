//! Telemetry envelope types
//!
//! One decoded sensor reading as published by a device over the
//! messaging bus. The wire format is JSON with PascalCase measurement
//! fields and a nested `data` object, matching what the sensor firmware
//! emits. Envelopes are immutable after decoding and are consumed by
//! exactly two paths: persistence and fan-out.

use serde::{Deserialize, Serialize};

/// Physical measurements for a single axis
///
/// All fields default to zero so partially-populated payloads decode
/// cleanly; emptiness is detected at the envelope level instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AxisReading {
    #[serde(rename = "Acceleration", default)]
    pub acceleration: f64,
    #[serde(rename = "VelocityAngular", default)]
    pub velocity_angular: f64,
    #[serde(rename = "VibrationSpeed", default)]
    pub vibration_speed: f64,
    #[serde(rename = "VibrationAngle", default)]
    pub vibration_angle: f64,
    #[serde(rename = "VibrationDisplacement", default)]
    pub vibration_displacement: f64,
    #[serde(rename = "Frequency", default)]
    pub frequency: f64,
}

/// Which measurement the sliding window folds over
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    #[default]
    Acceleration,
    VelocityAngular,
    VibrationSpeed,
    VibrationAngle,
    VibrationDisplacement,
    Frequency,
}

impl AxisReading {
    /// Extract the configured measurement from this reading
    pub fn sample(&self, field: SampleField) -> f64 {
        match field {
            SampleField::Acceleration => self.acceleration,
            SampleField::VelocityAngular => self.velocity_angular,
            SampleField::VibrationSpeed => self.vibration_speed,
            SampleField::VibrationAngle => self.vibration_angle,
            SampleField::VibrationDisplacement => self.vibration_displacement,
            SampleField::Frequency => self.frequency,
        }
    }

    fn is_zero(&self) -> bool {
        *self == AxisReading::default()
    }
}

/// The nested measurement block of one reading
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AxisSet {
    /// Hardware bus address of the sensor, informational only
    #[serde(rename = "DeviceAddress", default)]
    pub device_address: String,
    #[serde(rename = "X", default)]
    pub x: AxisReading,
    #[serde(rename = "Y", default)]
    pub y: AxisReading,
    #[serde(rename = "Z", default)]
    pub z: AxisReading,
    #[serde(rename = "Temperature", default)]
    pub temperature: f64,
}

/// One sensor reading, decoded and attributed to a device and user
///
/// `device_id` and `user_id` together identify the stream's owner and
/// are required for routing; the ingestion path rejects envelopes
/// missing either. The producer-assigned timestamp is not guaranteed
/// monotonic across messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetryEnvelope {
    #[serde(rename = "deviceID", default)]
    pub device_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    /// Human-readable timestamp as sent by the device, if any
    #[serde(rename = "Datetime", default)]
    pub datetime: String,
    /// Producer-assigned Unix timestamp
    #[serde(rename = "TimeStamp", default)]
    pub timestamp: i64,
    #[serde(rename = "data", default)]
    pub data: AxisSet,
}

impl TelemetryEnvelope {
    /// Decode an envelope from a raw bus payload
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Whether both routing identifiers are present
    pub fn has_identifiers(&self) -> bool {
        !self.device_id.is_empty() && !self.user_id.is_empty()
    }

    /// Whether the measurement payload carries no data at all
    ///
    /// All three axis records zero and temperature zero means the
    /// payload was a default-constructed or malformed decode; such
    /// envelopes are discarded before persistence and fan-out.
    pub fn is_empty(&self) -> bool {
        self.data.x.is_zero()
            && self.data.y.is_zero()
            && self.data.z.is_zero()
            && self.data.temperature == 0.0
    }
}
