//! Resume cursor: where the next aggregation step starts.

use serde::de::IgnoredAny;

use crate::error::Result;
use crate::period::{id_period, parse_period_key, PeriodLength};
use crate::store::Keyspace;

/// Progress of one `(metric, period length)` rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeCursor {
    /// No aggregates and no raw measurements.
    Empty,
    /// Start of the most recently aggregated period.
    Aggregated(u64),
    /// Nothing aggregated yet; start of the period holding the earliest
    /// measurement. The period before it counts as done.
    Unstarted(u64),
}

impl ResumeCursor {
    /// Reads the latest aggregate key, falling back to the earliest raw id.
    pub async fn resolve(
        length: PeriodLength,
        aggregates: &Keyspace,
        values: &Keyspace,
    ) -> Result<Self> {
        if let Some((key, IgnoredAny)) = aggregates.last::<IgnoredAny>().await? {
            return Ok(ResumeCursor::Aggregated(parse_period_key(&key)?));
        }
        match values.first::<IgnoredAny>().await? {
            Some((id, IgnoredAny)) => Ok(ResumeCursor::Unstarted(id_period(&id, length)?)),
            None => Ok(ResumeCursor::Empty),
        }
    }

    /// Start of the period the next step should aggregate.
    pub fn next_period(&self, length: PeriodLength) -> Option<u64> {
        match *self {
            ResumeCursor::Empty => None,
            ResumeCursor::Aggregated(last) => last.checked_add(length.as_millis()),
            ResumeCursor::Unstarted(first) => Some(first),
        }
    }

    pub fn last_aggregated(&self) -> Option<u64> {
        match *self {
            ResumeCursor::Aggregated(last) => Some(last),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::period_key;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    const HOUR: PeriodLength = PeriodLength::HOUR;

    fn namespaces() -> (Keyspace, Keyspace) {
        let root = Keyspace::root(Arc::new(InMemoryStore::new()));
        let metric = root.sub("m").unwrap();
        (
            metric.sub("agg").unwrap().sub(&HOUR.to_string()).unwrap(),
            metric.sub("val").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_empty_when_both_namespaces_empty() {
        let (agg, val) = namespaces();
        let cursor = ResumeCursor::resolve(HOUR, &agg, &val).await.unwrap();
        assert_eq!(cursor, ResumeCursor::Empty);
        assert_eq!(cursor.next_period(HOUR), None);
    }

    #[tokio::test]
    async fn test_unstarted_points_at_first_measurement_period() {
        let (agg, val) = namespaces();
        val.put_json("0000007300000-0000000001", &1.0).await.unwrap();
        val.put_json("0000010900000-0000000001", &1.0).await.unwrap();

        let cursor = ResumeCursor::resolve(HOUR, &agg, &val).await.unwrap();
        assert_eq!(cursor, ResumeCursor::Unstarted(7_200_000));
        assert_eq!(cursor.next_period(HOUR), Some(7_200_000));
        assert_eq!(cursor.last_aggregated(), None);
    }

    #[tokio::test]
    async fn test_first_measurement_in_period_zero() {
        let (agg, val) = namespaces();
        val.put_json("0000000000005-0000000001", &1.0).await.unwrap();

        let cursor = ResumeCursor::resolve(HOUR, &agg, &val).await.unwrap();
        assert_eq!(cursor.next_period(HOUR), Some(0));
    }

    #[tokio::test]
    async fn test_latest_aggregate_wins_over_raw() {
        let (agg, val) = namespaces();
        val.put_json("0000000000005-0000000001", &1.0).await.unwrap();
        agg.put_json(&period_key(3_600_000), &"x").await.unwrap();
        agg.put_json(&period_key(10_800_000), &"y").await.unwrap();

        let cursor = ResumeCursor::resolve(HOUR, &agg, &val).await.unwrap();
        assert_eq!(cursor, ResumeCursor::Aggregated(10_800_000));
        assert_eq!(cursor.next_period(HOUR), Some(14_400_000));
    }

    #[tokio::test]
    async fn test_malformed_raw_id_is_an_error() {
        let (agg, val) = namespaces();
        val.put_json("garbage", &1.0).await.unwrap();
        assert!(ResumeCursor::resolve(HOUR, &agg, &val).await.is_err());
    }
}
