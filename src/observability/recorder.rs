//! Telemetry recorder trait
//!
//! All rollup telemetry goes through [`RollupRecorder`] so deterministic tests
//! can swap in [`SimulatedRecorder`] and inspect what was emitted:
//! - `NoopRecorder`: default, compiles away
//! - `SimulatedRecorder`: in-memory recording for tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

pub trait RollupRecorder: Send + Sync + 'static {
    /// Increment a counter by 1
    fn incr(&self, name: &str, tags: &[&str]);

    /// Record a histogram/distribution value
    fn histogram(&self, name: &str, value: f64, tags: &[&str]);

    /// Set a gauge value
    fn gauge(&self, name: &str, value: f64, tags: &[&str]);

    /// One raw measurement appended
    fn record_write(&self, kind: &str) {
        let kind_tag = format!("kind:{kind}");
        self.incr("rollup.writes", &[&kind_tag]);
    }

    /// One finished aggregation step, tagged by its outcome label
    fn record_aggregate(&self, kind: &str, outcome: &str, duration_ms: f64) {
        let kind_tag = format!("kind:{kind}");
        let outcome_tag = format!("outcome:{outcome}");
        self.histogram("rollup.step.duration", duration_ms, &[&kind_tag, &outcome_tag]);
        self.incr("rollup.steps", &[&kind_tag, &outcome_tag]);
    }

    /// Number of raw measurements folded into a persisted period
    fn record_period(&self, kind: &str, count: u64) {
        let kind_tag = format!("kind:{kind}");
        self.gauge("rollup.period.count", count as f64, &[&kind_tag]);
    }

    /// A failed operation (`write`, `aggregate`, `read`)
    fn record_error(&self, kind: &str, operation: &str) {
        let kind_tag = format!("kind:{kind}");
        let op_tag = format!("operation:{operation}");
        self.incr("rollup.errors", &[&kind_tag, &op_tag]);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl RollupRecorder for NoopRecorder {
    #[inline]
    fn incr(&self, _name: &str, _tags: &[&str]) {}
    #[inline]
    fn histogram(&self, _name: &str, _value: f64, _tags: &[&str]) {}
    #[inline]
    fn gauge(&self, _name: &str, _value: f64, _tags: &[&str]) {}
}

#[derive(Debug, Clone)]
pub struct RecordedMetric {
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
    pub metric_type: MetricType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Records everything in memory for assertions
#[derive(Debug, Default)]
pub struct SimulatedRecorder {
    recorded: Mutex<Vec<RecordedMetric>>,
    write_count: AtomicU64,
    error_count: AtomicU64,
}

impl SimulatedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_recorded(&self) -> Vec<RecordedMetric> {
        self.recorded.lock().clone()
    }

    pub fn get_by_name(&self, name: &str) -> Vec<RecordedMetric> {
        self.recorded
            .lock()
            .iter()
            .filter(|m| m.name == name)
            .cloned()
            .collect()
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.recorded.lock().clear();
        self.write_count.store(0, Ordering::SeqCst);
        self.error_count.store(0, Ordering::SeqCst);
    }

    fn push(&self, name: &str, value: f64, tags: &[&str], metric_type: MetricType) {
        self.recorded.lock().push(RecordedMetric {
            name: name.to_string(),
            value,
            tags: tags.iter().map(|s| s.to_string()).collect(),
            metric_type,
        });
    }
}

impl RollupRecorder for SimulatedRecorder {
    fn incr(&self, name: &str, tags: &[&str]) {
        self.push(name, 1.0, tags, MetricType::Counter);
    }

    fn histogram(&self, name: &str, value: f64, tags: &[&str]) {
        self.push(name, value, tags, MetricType::Histogram);
    }

    fn gauge(&self, name: &str, value: f64, tags: &[&str]) {
        self.push(name, value, tags, MetricType::Gauge);
    }

    fn record_write(&self, kind: &str) {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        let kind_tag = format!("kind:{kind}");
        self.incr("rollup.writes", &[&kind_tag]);
    }

    fn record_error(&self, kind: &str, operation: &str) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
        let kind_tag = format!("kind:{kind}");
        let op_tag = format!("operation:{operation}");
        self.incr("rollup.errors", &[&kind_tag, &op_tag]);
    }
}

pub type SharedRecorder = Arc<dyn RollupRecorder>;

pub fn noop_recorder() -> SharedRecorder {
    Arc::new(NoopRecorder)
}

pub fn simulated_recorder() -> Arc<SimulatedRecorder> {
    Arc::new(SimulatedRecorder::new())
}
