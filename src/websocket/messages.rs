//! WebSocket frame types
//!
//! The telemetry channel sends one [`WindowFrame`] per envelope: the
//! session's current sliding-window contents for all three axes,
//! oldest sample first. The notification channel sends raw record
//! lines and has no frame type of its own.

use serde::Serialize;

use crate::telemetry::{SlidingWindow, TelemetryEnvelope};

/// One outbound telemetry frame: the windows after folding an envelope
#[derive(Debug, Clone, Serialize)]
pub struct WindowFrame {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub timestamp: i64,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl WindowFrame {
    /// Snapshot the window state for the envelope that just updated it
    pub fn new(envelope: &TelemetryEnvelope, window: &SlidingWindow) -> Self {
        Self {
            device_id: envelope.device_id.clone(),
            timestamp: envelope.timestamp,
            x: window.x(),
            y: window.y(),
            z: window.z(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::SampleField;

    #[test]
    fn test_frame_serialization() {
        let envelope = TelemetryEnvelope {
            device_id: "dev-1".to_string(),
            timestamp: 1699000000,
            ..Default::default()
        };
        let window = SlidingWindow::new(3, SampleField::Acceleration);

        let frame = WindowFrame::new(&envelope, &window);
        let json = serde_json::to_string(&frame).unwrap();

        assert!(json.contains("\"deviceID\":\"dev-1\""));
        assert!(json.contains("\"timestamp\":1699000000"));
        assert!(json.contains("\"x\":[0.0,0.0,0.0]"));
    }

    #[test]
    fn test_frame_reflects_window_contents() {
        let mut envelope = TelemetryEnvelope {
            device_id: "dev-1".to_string(),
            ..Default::default()
        };
        envelope.data.x.acceleration = 2.5;

        let mut window = SlidingWindow::new(2, SampleField::Acceleration);
        window.update(&envelope);

        let frame = WindowFrame::new(&envelope, &window);
        assert_eq!(frame.x, vec![0.0, 2.5]);
    }
}
