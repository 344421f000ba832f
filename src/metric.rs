//! Shared construction and namespace layout for counters and gauges
//!
//! ```text
//! !{prefix}!!val!{id}                 raw measurement (JSON number)
//! !{prefix}!!agg!!{L}!{period_key}    aggregate for period length L (JSON stats)
//! ```

use std::sync::Arc;

use tracing::Instrument;

use crate::config::MetricConfig;
use crate::error::{MetricError, Result};
use crate::id::IdGenerator;
use crate::io::{Clock, SharedClock, SystemClock};
use crate::observability::{noop_recorder, spans, SharedRecorder};
use crate::period::PeriodLength;
use crate::store::{Keyspace, SharedStore};

const VALUES: &str = "val";
const AGGREGATES: &str = "agg";

/// One metric instance bound to a store. Cheap to clone.
#[derive(Clone)]
pub struct Metric {
    namespace: Keyspace,
    values: Keyspace,
    aggregates: Keyspace,
    clock: SharedClock,
    ids: Arc<IdGenerator>,
    recorder: SharedRecorder,
    config: MetricConfig,
}

impl Metric {
    pub fn new(store: SharedStore, config: MetricConfig) -> Result<Self> {
        config.validate()?;
        let namespace = Keyspace::root(store).sub(&config.prefix)?;
        let values = namespace.sub(VALUES)?;
        let aggregates = namespace.sub(AGGREGATES)?;
        tracing::debug!(namespace = %namespace.prefix(), "metric opened");

        Ok(Metric {
            namespace,
            values,
            aggregates,
            clock: Arc::new(SystemClock),
            ids: Arc::new(IdGenerator::from_entropy()),
            recorder: noop_recorder(),
            config,
        })
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_recorder(mut self, recorder: SharedRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Absolute key prefix of this metric
    pub fn prefix(&self) -> &str {
        self.namespace.prefix()
    }

    /// Raw id→value namespace
    pub fn values(&self) -> &Keyspace {
        &self.values
    }

    /// Period-start→stats namespace for one period length
    pub fn aggregates(&self, length: PeriodLength) -> Result<Keyspace> {
        self.aggregates.sub(&length.to_string())
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn recorder(&self) -> &SharedRecorder {
        &self.recorder
    }

    /// Append `value` under a fresh id stamped with the current time.
    pub(crate) async fn append(&self, kind: &'static str, value: f64) -> Result<String> {
        if !value.is_finite() {
            return Err(MetricError::InvalidValue(value));
        }
        let id = self.ids.next_id(self.clock.now());
        let written = self
            .values
            .put_json(&id, &value)
            .instrument(spans::write_span(kind, self.prefix()))
            .await;

        match written {
            Ok(()) => {
                tracing::trace!(%id, value, "measurement recorded");
                self.recorder.record_write(kind);
                Ok(id)
            }
            Err(err) => {
                self.recorder.record_error(kind, "write");
                Err(err)
            }
        }
    }

    /// Value of the most recently keyed raw record
    pub async fn latest_value(&self) -> Result<Option<f64>> {
        let latest = self.values.last::<f64>().await?;
        Ok(latest.map(|(_, value)| value))
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("prefix", &self.namespace.prefix())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
