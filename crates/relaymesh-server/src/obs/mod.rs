//! Lightweight in-process metrics (dependency-free).
//!
//! Counters and gauges are stored as atomics keyed by label sets and rendered
//! by the ops `/metrics` handler.

pub mod metrics;

pub use metrics::{CounterVec, GaugeVec, ServerMetrics};
