//! Ordered key-value store abstraction
//!
//! The rollup engine needs very little from its store: single-key puts and
//! bounded range scans in either direction. Keys are compared as byte strings,
//! values are opaque bytes (JSON once they pass through a [`Keyspace`]).
//!
//! - [`InMemoryStore`]: `BTreeMap` behind a lock, lazily scanned in batches
//! - [`SimulatedStore`]: fault-injecting wrapper for deterministic simulation

pub mod keyspace;
pub mod memory;
pub mod simulated;

use std::future::Future;
use std::ops::Bound;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use keyspace::Keyspace;
pub use memory::InMemoryStore;
pub use simulated::{SimulatedStore, SimulatedStoreStats};

/// Failure reported by a store backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not complete the operation
    #[error("backend failure: {0}")]
    Backend(String),
    /// A simulated fault fired (see [`crate::buggify`])
    #[error("injected fault: {0}")]
    Injected(&'static str),
}

/// One stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Bytes,
}

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Ordered stream of entries. Ends after the first error.
pub type EntryStream = BoxStream<'static, Result<Entry, StoreError>>;

/// Range scan parameters, leveldb style.
///
/// When both an inclusive and an exclusive bound are given on the same side,
/// the tighter one applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub gte: Option<String>,
    pub gt: Option<String>,
    pub lte: Option<String>,
    pub lt: Option<String>,
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward scan, limit 1
    pub fn first() -> Self {
        Self::new().with_limit(1)
    }

    /// Reverse scan, limit 1
    pub fn last() -> Self {
        Self::new().reversed().with_limit(1)
    }

    pub fn gte(mut self, key: impl Into<String>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn gt(mut self, key: impl Into<String>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<String>) -> Self {
        self.lte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<String>) -> Self {
        self.lt = Some(key.into());
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

    /// Effective lower bound
    pub fn lower_bound(&self) -> Bound<&str> {
        match (self.gte.as_deref(), self.gt.as_deref()) {
            (Some(gte), Some(gt)) if gte > gt => Bound::Included(gte),
            (_, Some(gt)) => Bound::Excluded(gt),
            (Some(gte), None) => Bound::Included(gte),
            (None, None) => Bound::Unbounded,
        }
    }

    /// Effective upper bound
    pub fn upper_bound(&self) -> Bound<&str> {
        match (self.lte.as_deref(), self.lt.as_deref()) {
            (Some(lte), Some(lt)) if lte < lt => Bound::Included(lte),
            (_, Some(lt)) => Bound::Excluded(lt),
            (Some(lte), None) => Bound::Included(lte),
            (None, None) => Bound::Unbounded,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let above = match self.lower_bound() {
            Bound::Included(b) => key >= b,
            Bound::Excluded(b) => key > b,
            Bound::Unbounded => true,
        };
        let below = match self.upper_bound() {
            Bound::Included(b) => key <= b,
            Bound::Excluded(b) => key < b,
            Bound::Unbounded => true,
        };
        above && below
    }
}

/// True when no key can satisfy both bounds.
///
/// `BTreeMap::range` panics on inverted ranges, so callers check this first.
pub fn is_empty_range(lower: Bound<&str>, upper: Bound<&str>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u))
        | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}

/// Ordered key-value store
pub trait OrderedStore: Send + Sync + 'static {
    /// Atomically write one key
    fn put(&self, key: String, value: Bytes) -> StoreFuture<'_, ()>;

    /// Lazily scan a key range in ascending (or, if `reverse`, descending) order
    fn scan(&self, options: ScanOptions) -> EntryStream;
}

/// Shared store handle
pub type SharedStore = Arc<dyn OrderedStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_pick_tighter_side() {
        let opts = ScanOptions::new().gte("b").gt("a").lt("y").lte("x");
        assert_eq!(opts.lower_bound(), Bound::Included("b"));
        assert_eq!(opts.upper_bound(), Bound::Included("x"));

        let opts = ScanOptions::new().gte("a").gt("a");
        assert_eq!(opts.lower_bound(), Bound::Excluded("a"));
    }

    #[test]
    fn test_contains() {
        let opts = ScanOptions::new().gte("0100").lt("0200");
        assert!(opts.contains("0100"));
        assert!(opts.contains("0150-xyz"));
        assert!(!opts.contains("0200"));
        assert!(!opts.contains("0099"));
        assert!(ScanOptions::new().contains(""));
    }

    #[test]
    fn test_empty_range_detection() {
        assert!(is_empty_range(Bound::Included("b"), Bound::Included("a")));
        assert!(is_empty_range(Bound::Included("a"), Bound::Excluded("a")));
        assert!(!is_empty_range(Bound::Included("a"), Bound::Included("a")));
        assert!(!is_empty_range(Bound::Unbounded, Bound::Excluded("a")));
    }

    #[test]
    fn test_first_and_last_presets() {
        assert_eq!(ScanOptions::first().limit, Some(1));
        assert!(!ScanOptions::first().reverse);
        assert!(ScanOptions::last().reverse);
        assert_eq!(ScanOptions::last().limit, Some(1));
    }
}
