//! Instantaneous gauge

use crate::config::MetricConfig;
use crate::error::Result;
use crate::metric::Metric;
use crate::period::PeriodLength;
use crate::rollup::{
    AggregateOutcome, AggregateStream, AggregateStreamOptions, GaugeStats, MinMaxAvg, RollupEngine,
};
use crate::store::SharedStore;

/// Gauge backed by an ordered store. Aggregates to `{count, min, max, avg}`.
#[derive(Debug, Clone)]
pub struct Gauge {
    engine: RollupEngine<MinMaxAvg>,
}

impl Gauge {
    pub fn new(store: SharedStore, config: MetricConfig) -> Result<Self> {
        Ok(Self::from_metric(Metric::new(store, config)?))
    }

    pub fn from_metric(metric: Metric) -> Self {
        Gauge {
            engine: RollupEngine::new(metric),
        }
    }

    pub fn metric(&self) -> &Metric {
        self.engine.metric()
    }

    pub async fn set(&self, value: f64) -> Result<String> {
        self.engine.record(value).await
    }

    /// Most recently recorded value, `None` before the first `set`.
    pub async fn val(&self) -> Result<Option<f64>> {
        self.engine.metric().latest_value().await
    }

    pub async fn aggregate(&self, period_length_ms: u64) -> Result<AggregateOutcome<GaugeStats>> {
        self.engine.aggregate(PeriodLength::new(period_length_ms)?).await
    }

    pub fn create_aggregate_stream(
        &self,
        period_length_ms: u64,
        options: &AggregateStreamOptions,
    ) -> Result<AggregateStream<GaugeStats>> {
        // Bad options are reported ahead of a bad period length.
        options.validate()?;
        self.engine.stream(PeriodLength::new(period_length_ms)?, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use crate::io::{Duration, SimulatedClock, Timestamp};
    use crate::store::InMemoryStore;
    use futures::TryStreamExt;
    use std::sync::Arc;

    const SEC: u64 = 1_000;
    const T0: u64 = 1_600_000_000_000;

    fn gauge() -> (Arc<SimulatedClock>, Gauge) {
        let clock = Arc::new(SimulatedClock::new(Timestamp::from_millis(T0)));
        let metric = Metric::new(Arc::new(InMemoryStore::new()), MetricConfig::new())
            .unwrap()
            .with_clock(clock.clone());
        (clock, Gauge::from_metric(metric))
    }

    #[tokio::test]
    async fn test_val_tracks_latest_set() {
        let (clock, gauge) = gauge();
        assert_eq!(gauge.val().await.unwrap(), None);

        for v in [5.0, 1.0, 9.0] {
            gauge.set(v).await.unwrap();
            clock.advance(Duration::from_millis(1));
        }
        assert_eq!(gauge.val().await.unwrap(), Some(9.0));
    }

    #[tokio::test]
    async fn test_min_max_avg() {
        let (clock, gauge) = gauge();
        for v in [5.0, 1.0, 9.0] {
            gauge.set(v).await.unwrap();
            clock.advance(Duration::from_millis(10));
        }
        clock.set(Timestamp::from_millis(T0 + SEC));

        let outcome = gauge.aggregate(SEC).await.unwrap();
        assert_eq!(
            outcome.stats(),
            Some(&GaugeStats {
                count: 3,
                min: Some(1.0),
                max: Some(9.0),
                avg: Some(5.0),
            })
        );
    }

    #[tokio::test]
    async fn test_empty_period_has_count_only() {
        let (clock, gauge) = gauge();
        gauge.set(2.0).await.unwrap();
        clock.set(Timestamp::from_millis(T0 + 2 * SEC));

        gauge.aggregate(SEC).await.unwrap();
        let outcome = gauge.aggregate(SEC).await.unwrap();
        assert_eq!(
            outcome,
            AggregateOutcome::Aggregated {
                period: T0 + SEC,
                stats: GaugeStats::empty(),
            }
        );

        let records: Vec<_> = gauge
            .create_aggregate_stream(SEC, &AggregateStreamOptions::new().with_keys())
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let json = serde_json::to_value(&records[1].value).unwrap();
        assert_eq!(json, serde_json::json!({"count": 0}));
    }

    #[tokio::test]
    async fn test_empty_options_fail_first() {
        let (_, gauge) = gauge();
        let err = gauge
            .create_aggregate_stream(0, &AggregateStreamOptions::new())
            .unwrap_err();
        assert!(err.to_string().contains("keys"));
    }

    #[tokio::test]
    async fn test_overflowing_avg_is_rejected() {
        let (clock, gauge) = gauge();
        gauge.set(1e308).await.unwrap();
        gauge.set(1e308).await.unwrap();
        clock.set(Timestamp::from_millis(T0 + SEC));

        let err = gauge.aggregate(SEC).await.unwrap_err();
        assert!(matches!(err, MetricError::InvalidValue(_)));
        let records: Vec<_> = gauge
            .create_aggregate_stream(SEC, &AggregateStreamOptions::new().with_keys())
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert!(records.is_empty());
    }
}
