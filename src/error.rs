//! Error types for metric recording and rollup.

use thiserror::Error;

pub use crate::store::StoreError;

/// Result type alias for metric operations.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Errors surfaced by counters, gauges and the rollup engine.
///
/// Absence of data is not an error: an empty metric aggregates to
/// [`AggregateOutcome::NoData`](crate::rollup::AggregateOutcome::NoData).
#[derive(Debug, Error)]
pub enum MetricError {
    /// The backing store failed. Passed through unmodified, never retried.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid construction or call parameters, raised before any store access.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be encoded or decoded as JSON.
    #[error("codec error at key {key:?}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A raw measurement key does not carry a recoverable creation epoch.
    #[error("invalid sortable id: {0:?}")]
    InvalidId(String),

    /// An aggregate key is not a decimal period start.
    #[error("invalid period key: {0:?}")]
    InvalidKey(String),

    /// Measurements must be finite to survive JSON encoding.
    #[error("invalid measurement {0}: value must be finite")]
    InvalidValue(f64),
}

impl MetricError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MetricError::Configuration(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, MetricError::Configuration(_))
    }

    pub fn is_store(&self) -> bool {
        matches!(self, MetricError::Store(_))
    }
}
