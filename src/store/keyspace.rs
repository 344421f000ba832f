//! Namespaced, JSON-valued view over an [`OrderedStore`]
//!
//! Each nesting level wraps its name in `!` separators, so `root.sub("cpu")`
//! owns every key starting with `!cpu!` and `root.sub("cpu").sub("val")` owns
//! `!cpu!!val!`. Sibling namespaces never overlap because names may not contain
//! the separator.

use std::ops::Bound;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ScanOptions, SharedStore};
use crate::error::{MetricError, Result};

const SEPARATOR: char = '!';
// The character right after the separator, used as the exclusive namespace end.
const SEPARATOR_NEXT: char = '"';

/// Decoded `(key, value)` stream with namespace prefixes stripped
pub type JsonStream<T> = BoxStream<'static, Result<(String, T)>>;

#[derive(Clone)]
pub struct Keyspace {
    store: SharedStore,
    prefix: String,
}

impl Keyspace {
    /// The whole store, unprefixed
    pub fn root(store: SharedStore) -> Self {
        Keyspace {
            store,
            prefix: String::new(),
        }
    }

    /// Child namespace. The name may be empty but may not contain `!`.
    pub fn sub(&self, name: &str) -> Result<Keyspace> {
        if name.contains(SEPARATOR) {
            return Err(MetricError::configuration(format!(
                "namespace name {name:?} may not contain {SEPARATOR:?}"
            )));
        }
        Ok(Keyspace {
            store: self.store.clone(),
            prefix: format!("{}{SEPARATOR}{name}{SEPARATOR}", self.prefix),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    // Exclusive end of this namespace: the prefix with its trailing separator bumped.
    fn end(&self) -> Option<String> {
        let stem = self.prefix.strip_suffix(SEPARATOR)?;
        Some(format!("{stem}{SEPARATOR_NEXT}"))
    }

    /// Rewrite namespace-relative bounds into absolute store bounds.
    fn absolute(&self, options: ScanOptions) -> ScanOptions {
        if self.prefix.is_empty() {
            return options;
        }
        let lift = |key: Option<String>| key.map(|k| self.full_key(&k));
        let mut abs = ScanOptions {
            gte: lift(options.gte),
            gt: lift(options.gt),
            lte: lift(options.lte),
            lt: lift(options.lt),
            reverse: options.reverse,
            limit: options.limit,
        };
        if abs.lower_bound() == Bound::Unbounded {
            abs.gte = Some(self.prefix.clone());
        }
        if abs.upper_bound() == Bound::Unbounded {
            abs.lt = self.end();
        }
        abs
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_vec(value).map_err(|source| MetricError::Codec {
            key: key.to_string(),
            source,
        })?;
        self.store
            .put(self.full_key(key), Bytes::from(encoded))
            .await?;
        Ok(())
    }

    pub fn scan_json<T>(&self, options: ScanOptions) -> JsonStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let prefix_len = self.prefix.len();
        self.store
            .scan(self.absolute(options))
            .map(move |item| {
                let entry = item?;
                let key = entry.key.get(prefix_len..).unwrap_or_default().to_string();
                let value = serde_json::from_slice(&entry.value)
                    .map_err(|source| MetricError::Codec {
                        key: key.clone(),
                        source,
                    })?;
                Ok((key, value))
            })
            .boxed()
    }

    /// Lowest-keyed entry, if any
    pub async fn first<T>(&self) -> Result<Option<(String, T)>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.scan_json(ScanOptions::first()).next().await.transpose()
    }

    /// Highest-keyed entry, if any
    pub async fn last<T>(&self) -> Result<Option<(String, T)>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.scan_json(ScanOptions::last()).next().await.transpose()
    }
}

impl std::fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyspace")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
