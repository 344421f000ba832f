use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use super::{is_empty_range, Entry, EntryStream, OrderedStore, ScanOptions, StoreFuture};

/// Entries fetched per lock acquisition while scanning
const SCAN_BATCH: usize = 64;

type Tree = BTreeMap<String, Bytes>;

/// In-memory ordered store.
///
/// Scans do not hold the lock between batches: a long scan interleaves with
/// writes, and a write landing past the scan cursor is seen by it.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tree: Arc<RwLock<Tree>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tree.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.read().is_empty()
    }

    /// Synchronous point lookup
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.tree.read().get(key).cloned()
    }

    /// Every key currently stored, ascending
    pub fn keys(&self) -> Vec<String> {
        self.tree.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("len", &self.len())
            .finish()
    }
}

struct ScanState {
    tree: Arc<RwLock<Tree>>,
    options: ScanOptions,
    // Last key handed out; the next batch resumes strictly past it.
    cursor: Option<String>,
    remaining: Option<usize>,
    buffer: VecDeque<Entry>,
    exhausted: bool,
}

impl ScanState {
    fn fill(&mut self) {
        let want = match self.remaining {
            Some(0) => {
                self.exhausted = true;
                return;
            }
            Some(n) => n.min(SCAN_BATCH),
            None => SCAN_BATCH,
        };

        let tree = self.tree.read();
        let (mut lower, mut upper) = (self.options.lower_bound(), self.options.upper_bound());
        if let Some(cursor) = self.cursor.as_deref() {
            if self.options.reverse {
                upper = Bound::Excluded(cursor);
            } else {
                lower = Bound::Excluded(cursor);
            }
        }
        if is_empty_range(lower, upper) {
            self.exhausted = true;
            return;
        }

        let range = tree.range::<str, _>((lower, upper));
        let batch: Vec<Entry> = if self.options.reverse {
            range
                .rev()
                .take(want)
                .map(|(k, v)| Entry { key: k.clone(), value: v.clone() })
                .collect()
        } else {
            range
                .take(want)
                .map(|(k, v)| Entry { key: k.clone(), value: v.clone() })
                .collect()
        };
        drop(tree);

        if batch.len() < want {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.cursor = Some(last.key.clone());
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= batch.len();
        }
        self.buffer.extend(batch);
    }
}

impl OrderedStore for InMemoryStore {
    fn put(&self, key: String, value: Bytes) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.tree.write().insert(key, value);
            Ok(())
        })
    }

    fn scan(&self, options: ScanOptions) -> EntryStream {
        let state = ScanState {
            tree: self.tree.clone(),
            remaining: options.limit,
            options,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.buffer.is_empty() && !state.exhausted {
                state.fill();
            }
            let entry = state.buffer.pop_front()?;
            Some((Ok(entry), state))
        })
        .boxed()
    }
}
