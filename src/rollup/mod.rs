//! Incremental, resumable rollup of raw measurements
//!
//! Each [`RollupEngine::aggregate`] call advances one `(metric, period length)`
//! pair by at most one period:
//!
//! ```text
//! resume cursor ──► next period ──► still open? ──► scan raw [next, next + L)
//!                                     │                        │
//!                                     ▼                        ▼
//!                                   no-op            accumulate ─► put agg[next]
//! ```
//!
//! Steps are idempotent: a period whose put was lost is recomputed from the
//! same immutable raw range on the next call.

pub mod accumulator;
pub mod cursor;
pub mod stream;

use std::marker::PhantomData;
use std::time::Instant;

use futures::TryStreamExt;
use tracing::Instrument;

use crate::error::{MetricError, Result};
use crate::metric::Metric;
use crate::observability::spans;
use crate::period::{current_period, period_key, PeriodLength};
use crate::store::ScanOptions;

pub use accumulator::{Accumulator, CounterStats, GaugeStats, MinMaxAvg, SumCount};
pub use cursor::ResumeCursor;
pub use stream::{AggregateRecord, AggregateStream, AggregateStreamOptions};

/// Result of one aggregation step
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome<S> {
    /// The metric has no measurements and no aggregates.
    NoData,
    /// The next period to aggregate has not closed yet. Nothing was written.
    CurrentPeriod { period: u64 },
    /// `stats` was written for the period starting at `period`.
    Aggregated { period: u64, stats: S },
}

impl<S> AggregateOutcome<S> {
    /// True when nothing was written
    pub fn is_noop(&self) -> bool {
        !matches!(self, AggregateOutcome::Aggregated { .. })
    }

    pub fn stats(&self) -> Option<&S> {
        match self {
            AggregateOutcome::Aggregated { stats, .. } => Some(stats),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggregateOutcome::NoData => "no_data",
            AggregateOutcome::CurrentPeriod { .. } => "current_period",
            AggregateOutcome::Aggregated { .. } => "aggregated",
        }
    }
}

/// Rollup driver for one metric, specialised by its accumulator.
pub struct RollupEngine<A> {
    metric: Metric,
    _accumulator: PhantomData<fn() -> A>,
}

impl<A: Accumulator> RollupEngine<A> {
    pub fn new(metric: Metric) -> Self {
        RollupEngine {
            metric,
            _accumulator: PhantomData,
        }
    }

    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Append one raw measurement under a fresh sortable id.
    pub async fn record(&self, value: f64) -> Result<String> {
        self.metric.append(A::KIND, value).await
    }

    /// Where the next step for `length` would start.
    pub async fn cursor(&self, length: PeriodLength) -> Result<ResumeCursor> {
        let aggregates = self.metric.aggregates(length)?;
        ResumeCursor::resolve(length, &aggregates, self.metric.values()).await
    }

    /// Aggregate at most one closed period.
    pub async fn aggregate(&self, length: PeriodLength) -> Result<AggregateOutcome<A::Stats>> {
        let span = spans::aggregate_span(A::KIND, self.metric.prefix(), length.as_millis());
        let started = Instant::now();
        let result = self.step(length).instrument(span).await;

        let recorder = self.metric.recorder();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(outcome) => recorder.record_aggregate(A::KIND, outcome.label(), elapsed_ms),
            Err(err) => {
                tracing::warn!(kind = A::KIND, period_length_ms = length.as_millis(), error = %err, "aggregation step failed");
                recorder.record_error(A::KIND, "aggregate");
            }
        }
        result
    }

    async fn step(&self, length: PeriodLength) -> Result<AggregateOutcome<A::Stats>> {
        let aggregates = self.metric.aggregates(length)?;
        let present = current_period(length, self.metric.clock());

        let cursor = ResumeCursor::resolve(length, &aggregates, self.metric.values()).await?;
        let Some(next) = cursor.next_period(length) else {
            tracing::debug!("no data at all, nothing to aggregate");
            return Ok(AggregateOutcome::NoData);
        };

        if next >= present {
            tracing::debug!(period = next, present, "period still open, nothing written");
            return Ok(AggregateOutcome::CurrentPeriod { period: next });
        }

        let end = next.saturating_add(length.as_millis());
        let range = ScanOptions::new().gte(period_key(next)).lt(period_key(end));
        let mut raw = self.metric.values().scan_json::<f64>(range);

        let mut accumulator = A::default();
        while let Some((id, value)) = raw.try_next().await? {
            tracing::trace!(%id, value, "accumulating");
            accumulator.accumulate(value);
        }
        let count = accumulator.count();
        let stats = accumulator.finalize();
        if let Some(overflowed) = A::non_finite(&stats) {
            tracing::warn!(period = next, count, ?stats, "aggregate overflowed, not written");
            return Err(MetricError::InvalidValue(overflowed));
        }

        aggregates.put_json(&period_key(next), &stats).await?;
        tracing::debug!(period = next, count, ?stats, "aggregate written");
        self.metric.recorder().record_period(A::KIND, count);

        Ok(AggregateOutcome::Aggregated { period: next, stats })
    }

    /// Open a decorated stream over the aggregates persisted for `length`.
    pub fn stream(
        &self,
        length: PeriodLength,
        options: &AggregateStreamOptions,
    ) -> Result<AggregateStream<A::Stats>> {
        let aggregates = self.metric.aggregates(length)?;
        AggregateStream::open(&aggregates, options)
    }
}

impl<A> Clone for RollupEngine<A> {
    fn clone(&self) -> Self {
        RollupEngine {
            metric: self.metric.clone(),
            _accumulator: PhantomData,
        }
    }
}

impl<A: Accumulator> std::fmt::Debug for RollupEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollupEngine")
            .field("kind", &A::KIND)
            .field("metric", &self.metric)
            .finish()
    }
}
