//! Sortable measurement ids
//!
//! Format: `{epoch_ms:013}-{suffix:010}`. The zero-padded epoch prefix makes ids
//! sort by creation millisecond and compare correctly against period keys from
//! [`period_key`](crate::period::period_key); the suffix keeps ids written in
//! the same millisecond distinct.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{MetricError, Result};
use crate::io::Timestamp;
use crate::period::KEY_WIDTH;

const SUFFIX_WIDTH: usize = 10;
const SUFFIX_LIMIT: u64 = 10_000_000_000;
// Fresh milliseconds start low enough to leave room for same-millisecond bumps.
const SUFFIX_START_LIMIT: u64 = 1_000_000_000;

/// Recover the creation epoch embedded in a sortable id.
pub fn epoch_of(id: &str) -> Result<u64> {
    let invalid = || MetricError::InvalidId(id.to_string());
    let (epoch, suffix) = id.split_once('-').ok_or_else(invalid)?;
    if epoch.is_empty()
        || suffix.is_empty()
        || !epoch.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    epoch.parse::<u64>().map_err(|_| invalid())
}

struct GeneratorState {
    rng: ChaCha8Rng,
    last_ms: u64,
    last_suffix: u64,
}

/// Generates unique ids that sort consistently with creation time.
///
/// Within one generator, ids issued in the same millisecond are strictly
/// increasing.
pub struct IdGenerator {
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    pub fn from_entropy() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    /// Deterministic suffixes for reproducible simulations
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        IdGenerator {
            state: Mutex::new(GeneratorState {
                rng,
                last_ms: u64::MAX,
                last_suffix: 0,
            }),
        }
    }

    pub fn next_id(&self, now: Timestamp) -> String {
        let ms = now.as_millis();
        let mut state = self.state.lock();
        let suffix = if ms == state.last_ms && state.last_suffix + 1 < SUFFIX_LIMIT {
            state.last_suffix + 1
        } else {
            state.rng.gen_range(0..SUFFIX_START_LIMIT)
        };
        state.last_ms = ms;
        state.last_suffix = suffix;
        format!(
            "{:0kw$}-{:0sw$}",
            ms,
            suffix,
            kw = KEY_WIDTH,
            sw = SUFFIX_WIDTH
        )
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}
