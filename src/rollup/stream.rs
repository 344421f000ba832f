//! Decorated reads over persisted aggregates.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use futures::stream::{FusedStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};
use crate::period::{parse_period_key, period_key};
use crate::store::keyspace::JsonStream;
use crate::store::{Keyspace, ScanOptions};

/// Which fields each record carries, plus the forwarded range scan.
///
/// Range bounds are epoch milliseconds compared against period starts. At
/// least one of `keys`, `epoch`, `date`, `iso` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateStreamOptions {
    pub keys: bool,
    pub epoch: bool,
    pub date: bool,
    pub iso: bool,
    pub gte: Option<u64>,
    pub gt: Option<u64>,
    pub lte: Option<u64>,
    pub lt: Option<u64>,
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl AggregateStreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(mut self) -> Self {
        self.keys = true;
        self
    }

    pub fn with_epoch(mut self) -> Self {
        self.epoch = true;
        self
    }

    pub fn with_date(mut self) -> Self {
        self.date = true;
        self
    }

    pub fn with_iso(mut self) -> Self {
        self.iso = true;
        self
    }

    pub fn gte(mut self, epoch_ms: u64) -> Self {
        self.gte = Some(epoch_ms);
        self
    }

    pub fn gt(mut self, epoch_ms: u64) -> Self {
        self.gt = Some(epoch_ms);
        self
    }

    pub fn lte(mut self, epoch_ms: u64) -> Self {
        self.lte = Some(epoch_ms);
        self
    }

    pub fn lt(mut self, epoch_ms: u64) -> Self {
        self.lt = Some(epoch_ms);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.keys || self.epoch || self.date || self.iso) {
            return Err(MetricError::configuration(
                "aggregate stream requires at least one of {keys, epoch, date, iso}",
            ));
        }
        Ok(())
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            gte: self.gte.map(period_key),
            gt: self.gt.map(period_key),
            lte: self.lte.map(period_key),
            lt: self.lt.map(period_key),
            reverse: self.reverse,
            limit: self.limit,
        }
    }
}

/// One persisted aggregate with the requested decorations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRecord<S> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<String>,
    pub value: S,
}

#[derive(Debug, Clone, Copy)]
struct Decorations {
    keys: bool,
    epoch: bool,
    date: bool,
    iso: bool,
}

/// Lazy, ordered, finite stream of aggregate records.
///
/// Yields at most one error, after which it is terminated. Dropping the
/// stream abandons the underlying scan.
pub struct AggregateStream<S> {
    inner: JsonStream<S>,
    decorations: Decorations,
    finished: bool,
}

impl<S> AggregateStream<S>
where
    S: DeserializeOwned + Send + 'static,
{
    /// Validates `options`, then starts the scan.
    pub fn open(aggregates: &Keyspace, options: &AggregateStreamOptions) -> Result<Self> {
        options.validate()?;
        tracing::debug!(
            namespace = %aggregates.prefix(),
            reverse = options.reverse,
            limit = ?options.limit,
            "opening aggregate stream"
        );
        Ok(AggregateStream {
            inner: aggregates.scan_json(options.scan_options()),
            decorations: Decorations {
                keys: options.keys,
                epoch: options.epoch,
                date: options.date,
                iso: options.iso,
            },
            finished: false,
        })
    }
}

impl<S> AggregateStream<S> {
    fn decorate(&self, key: String, value: S) -> Result<AggregateRecord<S>> {
        // The native key is always parsed, even when it is not emitted.
        let epoch = parse_period_key(&key)?;
        let needs_date = self.decorations.date || self.decorations.iso;
        let date = if needs_date {
            let millis = i64::try_from(epoch).map_err(|_| MetricError::InvalidKey(key.clone()))?;
            Some(
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| MetricError::InvalidKey(key.clone()))?,
            )
        } else {
            None
        };

        Ok(AggregateRecord {
            iso: date
                .filter(|_| self.decorations.iso)
                .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            date: date.filter(|_| self.decorations.date),
            epoch: self.decorations.epoch.then_some(epoch),
            key: self.decorations.keys.then_some(key),
            value,
        })
    }
}

impl<S> Stream for AggregateStream<S> {
    type Item = Result<AggregateRecord<S>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        let item = match ready!(this.inner.poll_next_unpin(cx)) {
            None => None,
            Some(Ok((key, value))) => Some(this.decorate(key, value)),
            Some(Err(err)) => Some(Err(err)),
        };
        if !matches!(item, Some(Ok(_))) {
            this.finished = true;
        }
        Poll::Ready(item)
    }
}

impl<S> FusedStream for AggregateStream<S> {
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S> std::fmt::Debug for AggregateStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateStream")
            .field("decorations", &self.decorations)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buggify::{faults, FaultConfig};
    use crate::rollup::accumulator::CounterStats;
    use crate::store::{InMemoryStore, SimulatedStore};
    use futures::TryStreamExt;
    use std::sync::Arc;

    const H: u64 = 3_600_000;

    async fn seeded_namespace() -> Keyspace {
        let ns = Keyspace::root(Arc::new(InMemoryStore::new()))
            .sub("agg")
            .unwrap();
        for (i, period) in [H * 400_000, H * 400_001, H * 400_002].into_iter().enumerate() {
            let stats = CounterStats {
                count: i as u64,
                total: i as f64 * 10.0,
            };
            ns.put_json(&period_key(period), &stats).await.unwrap();
        }
        ns
    }

    async fn collect(
        ns: &Keyspace,
        options: AggregateStreamOptions,
    ) -> Vec<AggregateRecord<CounterStats>> {
        AggregateStream::open(ns, &options)
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    }

    #[test]
    fn test_no_decoration_is_configuration_error() {
        let err = AggregateStreamOptions::new().validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(AggregateStreamOptions::new().with_iso().validate().is_ok());
    }

    #[tokio::test]
    async fn test_open_fails_before_any_scan() {
        let inner = Arc::new(InMemoryStore::new());
        let sim = SimulatedStore::shared(inner, FaultConfig::disabled(), 0);
        let ns = Keyspace::root(sim.clone()).sub("agg").unwrap();

        let result = AggregateStream::<CounterStats>::open(&ns, &AggregateStreamOptions::new());
        assert!(result.unwrap_err().is_configuration());
        assert_eq!(sim.stats().scans, 0);
    }

    #[tokio::test]
    async fn test_keys_only() {
        let ns = seeded_namespace().await;
        let records = collect(&ns, AggregateStreamOptions::new().with_keys()).await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].key.as_deref(), Some("1440000000000"));
        assert!(records.iter().all(|r| r.epoch.is_none() && r.date.is_none() && r.iso.is_none()));
        assert_eq!(records[2].value, CounterStats { count: 2, total: 20.0 });
    }

    #[tokio::test]
    async fn test_epoch_date_iso_without_keys() {
        let ns = seeded_namespace().await;
        let records = collect(
            &ns,
            AggregateStreamOptions::new().with_epoch().with_date().with_iso(),
        )
        .await;

        let first = &records[0];
        assert!(first.key.is_none());
        assert_eq!(first.epoch, Some(1_440_000_000_000));
        assert_eq!(
            first.date,
            Some(Utc.timestamp_millis_opt(1_440_000_000_000).unwrap())
        );
        assert_eq!(first.iso.as_deref(), Some("2015-08-19T16:00:00.000Z"));
    }

    #[tokio::test]
    async fn test_range_reverse_and_limit() {
        let ns = seeded_namespace().await;
        let records = collect(
            &ns,
            AggregateStreamOptions::new()
                .with_epoch()
                .gte(H * 400_001)
                .reversed(),
        )
        .await;
        let epochs: Vec<u64> = records.iter().filter_map(|r| r.epoch).collect();
        assert_eq!(epochs, [H * 400_002, H * 400_001]);

        let records = collect(&ns, AggregateStreamOptions::new().with_epoch().with_limit(1)).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].epoch, Some(H * 400_000));

        let records = collect(
            &ns,
            AggregateStreamOptions::new().with_epoch().gt(H * 400_000).lt(H * 400_002),
        )
        .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].epoch, Some(H * 400_001));
    }

    #[tokio::test]
    async fn test_reissue_gives_fresh_pass() {
        let ns = seeded_namespace().await;
        let options = AggregateStreamOptions::new().with_keys();
        assert_eq!(collect(&ns, options.clone()).await, collect(&ns, options).await);
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let inner = InMemoryStore::new();
        let seeded = Keyspace::root(Arc::new(inner.clone())).sub("agg").unwrap();
        seeded
            .put_json(&period_key(H), &CounterStats { count: 1, total: 1.0 })
            .await
            .unwrap();

        let sim = SimulatedStore::shared(
            Arc::new(inner),
            FaultConfig::new().always(faults::store::SCAN_FAIL),
            0,
        );
        let ns = Keyspace::root(sim).sub("agg").unwrap();
        let mut stream =
            AggregateStream::<CounterStats>::open(&ns, &AggregateStreamOptions::new().with_keys())
                .unwrap();

        assert!(stream.next().await.unwrap().unwrap_err().is_store());
        assert!(stream.is_terminated());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_record_serialization_skips_absent_fields() {
        let record = AggregateRecord {
            key: None,
            epoch: Some(5),
            date: None,
            iso: None,
            value: CounterStats { count: 1, total: 2.0 },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"epoch": 5, "value": {"count": 1, "total": 2.0}})
        );
    }
}
