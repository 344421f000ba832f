//! Counters and gauges over an ordered key-value store, rolled up into
//! fixed-length period aggregates one closed period at a time.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metric_rollup::{AggregateStreamOptions, Counter, InMemoryStore, MetricConfig};
//!
//! let counter = Counter::new(Arc::new(InMemoryStore::new()), MetricConfig::new().with_prefix("hits"))?;
//! counter.add(1.0).await?;
//! while !counter.aggregate(3_600_000).await?.is_noop() {}
//! let stream = counter.create_aggregate_stream(3_600_000, &AggregateStreamOptions::new().with_iso())?;
//! ```

pub mod buggify;
pub mod config;
pub mod counter;
pub mod error;
pub mod gauge;
pub mod id;
pub mod io;
pub mod metric;
pub mod observability;
pub mod period;
pub mod rollup;
pub mod store;

pub use config::{LogConfig, LogFormat, MetricConfig, MetricOptions, RollupSettings};
pub use counter::Counter;
pub use error::{MetricError, Result, StoreError};
pub use gauge::Gauge;
pub use io::{Clock, SimulatedClock, SystemClock, Timestamp};
pub use metric::Metric;
pub use period::PeriodLength;
pub use rollup::{
    AggregateOutcome, AggregateRecord, AggregateStream, AggregateStreamOptions, CounterStats,
    GaugeStats,
};
pub use store::{InMemoryStore, OrderedStore, SharedStore, SimulatedStore};
