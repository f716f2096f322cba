//! Telemetry ingestion
//!
//! The single consumer of the inbound bus subscription. Decodes and
//! validates each raw payload, persists accepted envelopes through the
//! document store, hands them to the fan-out hub, and mirrors the raw
//! payload back out on the configured topic.

mod subscriber;

pub use subscriber::{IngestOutcome, Subscriber};
