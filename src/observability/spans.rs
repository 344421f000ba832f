//! Span helpers for rollup operations

use tracing::{span, Level, Span};

/// Span covering one aggregation step
#[inline]
pub fn aggregate_span(kind: &'static str, metric: &str, period_length_ms: u64) -> Span {
    span!(
        Level::DEBUG,
        "aggregate",
        kind,
        metric = %metric,
        period_length_ms
    )
}

/// Span covering one raw write
#[inline]
pub fn write_span(kind: &'static str, metric: &str) -> Span {
    span!(Level::TRACE, "write", kind, metric = %metric)
}
