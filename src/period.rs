//! Period-boundary arithmetic.
//!
//! A period of length `L` starts at an exact multiple of `L` measured from the
//! Unix epoch. Period starts are stored as fixed-width decimal keys so that the
//! store's lexicographic order matches numeric order.

use std::fmt;

use crate::error::{MetricError, Result};
use crate::id;
use crate::io::Clock;

/// Width of a zero-padded epoch-millisecond key. Covers dates up to year 2286.
pub const KEY_WIDTH: usize = 13;

/// A validated, strictly positive period length in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodLength(u64);

impl PeriodLength {
    pub const MINUTE: PeriodLength = PeriodLength(60_000);
    pub const HOUR: PeriodLength = PeriodLength(3_600_000);
    pub const DAY: PeriodLength = PeriodLength(86_400_000);

    pub fn new(ms: u64) -> Result<Self> {
        if ms == 0 {
            return Err(MetricError::configuration(
                "period length must be a positive number of milliseconds",
            ));
        }
        Ok(PeriodLength(ms))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeriodLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for PeriodLength {
    type Error = MetricError;

    fn try_from(ms: u64) -> Result<Self> {
        PeriodLength::new(ms)
    }
}

/// Start of the period containing `epoch_ms`.
pub fn period_start(epoch_ms: u64, length: PeriodLength) -> u64 {
    (epoch_ms / length.0) * length.0
}

/// Start of the still-open period containing the clock's "now".
pub fn current_period(length: PeriodLength, clock: &dyn Clock) -> u64 {
    period_start(clock.now().as_millis(), length)
}

/// Start of the period in which the sortable id `raw_id` was created.
pub fn id_period(raw_id: &str, length: PeriodLength) -> Result<u64> {
    Ok(period_start(id::epoch_of(raw_id)?, length))
}

/// Store key for a period start (or any epoch-millisecond bound).
pub fn period_key(epoch_ms: u64) -> String {
    format!("{:0width$}", epoch_ms, width = KEY_WIDTH)
}

/// Inverse of [`period_key`].
pub fn parse_period_key(key: &str) -> Result<u64> {
    key.parse::<u64>()
        .map_err(|_| MetricError::InvalidKey(key.to_string()))
}
