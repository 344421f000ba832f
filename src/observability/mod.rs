//! Logging and telemetry
//!
//! Two independent hooks:
//! - `tracing` spans and events throughout the crate. They are silent until a
//!   binary installs a subscriber with [`init_tracing`].
//! - a [`RollupRecorder`] injected into each `Metric`, defaulting to
//!   [`NoopRecorder`]. Tests use [`SimulatedRecorder`] to assert on it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use metric_rollup::config::LogConfig;
//! use metric_rollup::observability::init_tracing;
//!
//! init_tracing(&LogConfig::default())?;
//! ```

pub mod recorder;
pub mod spans;
pub mod tracing_setup;

pub use recorder::{
    noop_recorder, simulated_recorder, MetricType, NoopRecorder, RecordedMetric, RollupRecorder,
    SharedRecorder, SimulatedRecorder,
};
pub use tracing_setup::init as init_tracing;
