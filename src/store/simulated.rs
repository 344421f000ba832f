//! Fault-injecting store wrapper for deterministic simulation
//!
//! Every put and scan rolls a seeded RNG against the [`FaultConfig`]; the same
//! seed and the same call sequence always produce the same faults.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{EntryStream, OrderedStore, ScanOptions, SharedStore, StoreError, StoreFuture};
use crate::buggify::{faults, FaultConfig};

/// Most entries a scan yields before an interrupt fault fires
const MAX_ENTRIES_BEFORE_INTERRUPT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedStoreStats {
    pub puts: u64,
    pub scans: u64,
    pub failed_puts: u64,
    pub failed_scans: u64,
    pub interrupted_scans: u64,
}

#[derive(Default)]
struct Counters {
    puts: AtomicU64,
    scans: AtomicU64,
    failed_puts: AtomicU64,
    failed_scans: AtomicU64,
    interrupted_scans: AtomicU64,
}

pub struct SimulatedStore {
    inner: SharedStore,
    faults: Mutex<FaultConfig>,
    rng: Mutex<ChaCha8Rng>,
    counters: Counters,
}

impl SimulatedStore {
    pub fn new(inner: SharedStore, faults: FaultConfig, seed: u64) -> Self {
        SimulatedStore {
            inner,
            faults: Mutex::new(faults),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            counters: Counters::default(),
        }
    }

    pub fn shared(inner: SharedStore, faults: FaultConfig, seed: u64) -> Arc<Self> {
        Arc::new(Self::new(inner, faults, seed))
    }

    /// Swap the fault profile, e.g. to let a run quiesce
    pub fn set_faults(&self, faults: FaultConfig) {
        *self.faults.lock() = faults;
    }

    pub fn stats(&self) -> SimulatedStoreStats {
        SimulatedStoreStats {
            puts: self.counters.puts.load(Ordering::SeqCst),
            scans: self.counters.scans.load(Ordering::SeqCst),
            failed_puts: self.counters.failed_puts.load(Ordering::SeqCst),
            failed_scans: self.counters.failed_scans.load(Ordering::SeqCst),
            interrupted_scans: self.counters.interrupted_scans.load(Ordering::SeqCst),
        }
    }

    fn roll(&self, fault_id: &'static str) -> bool {
        let value: f64 = self.rng.lock().gen();
        self.faults.lock().should_trigger(fault_id, value)
    }
}

impl OrderedStore for SimulatedStore {
    fn put(&self, key: String, value: Bytes) -> StoreFuture<'_, ()> {
        self.counters.puts.fetch_add(1, Ordering::SeqCst);
        if self.roll(faults::store::PUT_FAIL) {
            self.counters.failed_puts.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(%key, "injected put failure");
            return Box::pin(async { Err(StoreError::Injected(faults::store::PUT_FAIL)) });
        }
        self.inner.put(key, value)
    }

    fn scan(&self, options: ScanOptions) -> EntryStream {
        self.counters.scans.fetch_add(1, Ordering::SeqCst);
        if self.roll(faults::store::SCAN_FAIL) {
            self.counters.failed_scans.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(?options, "injected scan failure");
            return stream::once(async { Err(StoreError::Injected(faults::store::SCAN_FAIL)) })
                .boxed();
        }
        if self.roll(faults::store::SCAN_INTERRUPT) {
            self.counters.interrupted_scans.fetch_add(1, Ordering::SeqCst);
            let after = self.rng.lock().gen_range(0..=MAX_ENTRIES_BEFORE_INTERRUPT);
            tracing::trace!(?options, after, "injected scan interrupt");
            return self
                .inner
                .scan(options)
                .take(after)
                .chain(stream::once(async {
                    Err(StoreError::Injected(faults::store::SCAN_INTERRUPT))
                }))
                .boxed();
        }
        self.inner.scan(options)
    }
}

impl std::fmt::Debug for SimulatedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedStore")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
