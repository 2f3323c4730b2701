//! Memoizing request cache
//!
//! A concurrency-safe, at-most-once-per-key cache for short-lived
//! processes. Both successful values and errors are stored, so a lookup
//! known to fail is not retried within the same run.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::Mutex;

/// Map-based async cache keyed on `K`.
///
/// One mutex guards the whole cache and is held across the compute
/// future, so the first caller for a key wins and racing callers block
/// until they can reuse its stored result. Coarse, but the expensive
/// work is the network call being avoided on a hit, not lock
/// contention.
#[derive(Debug, Default)]
pub struct Cache<K, V, E> {
    entries: Mutex<HashMap<K, Result<V, E>>>,
}

impl<K, V, E> Cache<K, V, E>
where
    K: Eq + Hash,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached result for `key`, computing and storing it on
    /// first use.
    pub async fn do_cached<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut entries = self.entries.lock().await;
        if let Some(cached) = entries.get(&key) {
            return cached.clone();
        }
        let result = compute().await;
        entries.insert(key, result.clone());
        result
    }
}
