//! Monotonically accumulating counter

use crate::config::MetricConfig;
use crate::error::Result;
use crate::metric::Metric;
use crate::period::PeriodLength;
use crate::rollup::{
    AggregateOutcome, AggregateStream, AggregateStreamOptions, CounterStats, RollupEngine, SumCount,
};
use crate::store::SharedStore;

/// Counter backed by an ordered store.
///
/// Each [`add`](Counter::add) appends one raw record. [`aggregate`](Counter::aggregate)
/// folds closed periods into `{count, total}` one period per call.
#[derive(Debug, Clone)]
pub struct Counter {
    engine: RollupEngine<SumCount>,
}

impl Counter {
    pub fn new(store: SharedStore, config: MetricConfig) -> Result<Self> {
        Ok(Self::from_metric(Metric::new(store, config)?))
    }

    pub fn from_metric(metric: Metric) -> Self {
        Counter {
            engine: RollupEngine::new(metric),
        }
    }

    pub fn metric(&self) -> &Metric {
        self.engine.metric()
    }

    /// Record `value`, returning the id it was stored under.
    pub async fn add(&self, value: f64) -> Result<String> {
        self.engine.record(value).await
    }

    pub async fn aggregate(&self, period_length_ms: u64) -> Result<AggregateOutcome<CounterStats>> {
        self.engine.aggregate(PeriodLength::new(period_length_ms)?).await
    }

    pub fn create_aggregate_stream(
        &self,
        period_length_ms: u64,
        options: &AggregateStreamOptions,
    ) -> Result<AggregateStream<CounterStats>> {
        // Bad options are reported ahead of a bad period length.
        options.validate()?;
        self.engine.stream(PeriodLength::new(period_length_ms)?, options)
    }
}
