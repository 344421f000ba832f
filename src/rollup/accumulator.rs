//! Per-period accumulators
//!
//! An accumulator is fed every raw value of one period in key order and then
//! finalized into the stats record persisted for that period. Finalizing is a
//! pure function of the values seen, so replaying a period always reproduces
//! the same record.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub trait Accumulator: Default + Send {
    /// Persisted per-period record
    type Stats: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Label used in logs and telemetry tags
    const KIND: &'static str;

    fn accumulate(&mut self, value: f64);

    /// Values accumulated so far
    fn count(&self) -> u64;

    fn finalize(self) -> Self::Stats;

    /// First stats field that overflowed to a non-finite number, if any.
    /// Such a record cannot be written as JSON without losing the value.
    fn non_finite(stats: &Self::Stats) -> Option<f64>;
}

/// Counter rollup: `{count, total}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterStats {
    pub count: u64,
    pub total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SumCount {
    count: u64,
    total: f64,
}

impl Accumulator for SumCount {
    type Stats = CounterStats;
    const KIND: &'static str = "counter";

    fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn finalize(self) -> CounterStats {
        CounterStats {
            count: self.count,
            total: self.total,
        }
    }

    fn non_finite(stats: &CounterStats) -> Option<f64> {
        Some(stats.total).filter(|total| !total.is_finite())
    }
}

/// Gauge rollup: `{count}`, plus `{min, max, avg}` once any value was seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeStats {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
}

impl GaugeStats {
    pub fn empty() -> Self {
        GaugeStats {
            count: 0,
            min: None,
            max: None,
            avg: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinMaxAvg {
    count: u64,
    min: f64,
    max: f64,
    total: f64,
}

impl Default for MinMaxAvg {
    fn default() -> Self {
        MinMaxAvg {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            total: 0.0,
        }
    }
}

impl Accumulator for MinMaxAvg {
    type Stats = GaugeStats;
    const KIND: &'static str = "gauge";

    fn accumulate(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.total += value;
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn finalize(self) -> GaugeStats {
        if self.count == 0 {
            return GaugeStats::empty();
        }
        GaugeStats {
            count: self.count,
            min: Some(self.min),
            max: Some(self.max),
            avg: Some(self.total / self.count as f64),
        }
    }

    fn non_finite(stats: &GaugeStats) -> Option<f64> {
        [stats.min, stats.max, stats.avg]
            .into_iter()
            .flatten()
            .find(|v| !v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run<A: Accumulator>(values: &[f64]) -> A::Stats {
        let mut acc = A::default();
        for &v in values {
            acc.accumulate(v);
        }
        assert_eq!(acc.count(), values.len() as u64);
        acc.finalize()
    }

    #[test]
    fn test_sum_count() {
        assert_eq!(
            run::<SumCount>(&[1.0, 2.0, 3.0]),
            CounterStats { count: 3, total: 6.0 }
        );
        assert_eq!(run::<SumCount>(&[]), CounterStats { count: 0, total: 0.0 });
        assert_eq!(
            run::<SumCount>(&[-1.5, 0.5]),
            CounterStats { count: 2, total: -1.0 }
        );
    }

    #[test]
    fn test_min_max_avg() {
        assert_eq!(
            run::<MinMaxAvg>(&[5.0, 1.0, 9.0]),
            GaugeStats {
                count: 3,
                min: Some(1.0),
                max: Some(9.0),
                avg: Some(5.0),
            }
        );
        assert_eq!(run::<MinMaxAvg>(&[]), GaugeStats::empty());
    }

    #[test]
    fn test_single_gauge_value() {
        let stats = run::<MinMaxAvg>(&[-4.0]);
        assert_eq!((stats.min, stats.max, stats.avg), (Some(-4.0), Some(-4.0), Some(-4.0)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let counter = run::<SumCount>(&[1e308, 1e308]);
        assert_eq!(SumCount::non_finite(&counter), Some(f64::INFINITY));
        assert_eq!(SumCount::non_finite(&run::<SumCount>(&[1e308, -1e308])), None);

        let gauge = run::<MinMaxAvg>(&[1e308, 1e308]);
        assert_eq!(gauge.max, Some(1e308));
        assert_eq!(MinMaxAvg::non_finite(&gauge), Some(f64::INFINITY));
        assert_eq!(MinMaxAvg::non_finite(&GaugeStats::empty()), None);
    }

    #[test]
    fn test_counter_stats_json_shape() {
        let value = serde_json::to_value(CounterStats { count: 0, total: 0.0 }).unwrap();
        assert_eq!(value, json!({"count": 0, "total": 0.0}));
    }

    #[test]
    fn test_empty_gauge_omits_summary_fields() {
        let value = serde_json::to_value(GaugeStats::empty()).unwrap();
        assert_eq!(value, json!({"count": 0}));

        let back: GaugeStats = serde_json::from_value(json!({"count": 0})).unwrap();
        assert_eq!(back, GaugeStats::empty());
    }

    #[test]
    fn test_gauge_json_round_trip() {
        let stats = run::<MinMaxAvg>(&[2.0, 4.0]);
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value, json!({"count": 2, "min": 2.0, "max": 4.0, "avg": 3.0}));
    }
}
