// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single-value cache refreshed lazily once its time-to-live has passed.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct Entry<V> {
    value: Arc<V>,
    refreshed_at: Instant,
}

/// Holds one value plus the instant it was last loaded.
///
/// Readers share the cached value; the first caller past the TTL reloads it
/// while holding the write lock, so concurrent callers do not all reload.
pub struct TtlCache<V> {
    ttl: Duration,
    slot: RwLock<Option<Entry<V>>>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    fn fresh(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.refreshed_at) < self.ttl
    }

    /// Return the cached value, loading it first if absent or stale.
    pub async fn get_or_refresh<F, Fut, E>(&self, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_refresh_at(Instant::now(), load).await
    }

    /// [`get_or_refresh`](Self::get_or_refresh) with an explicit clock reading.
    pub async fn get_or_refresh_at<F, Fut, E>(&self, now: Instant, load: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        {
            let slot = self.slot.read().await;
            if let Some(entry) = slot.as_ref()
                && self.fresh(entry, now)
            {
                return Ok(Arc::clone(&entry.value));
            }
        }

        let mut slot = self.slot.write().await;
        if let Some(entry) = slot.as_ref()
            && self.fresh(entry, now)
        {
            return Ok(Arc::clone(&entry.value));
        }

        let value = Arc::new(load().await?);
        *slot = Some(Entry {
            value: Arc::clone(&value),
            refreshed_at: now,
        });
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    async fn load(counter: &AtomicUsize) -> Result<usize, String> {
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[tokio::test]
    async fn reuses_value_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let loads = AtomicUsize::new(0);
        let start = Instant::now();

        let first = cache.get_or_refresh_at(start, || load(&loads)).await.unwrap();
        let second = cache
            .get_or_refresh_at(start + Duration::from_secs(59), || load(&loads))
            .await
            .unwrap();
        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reloads_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let loads = AtomicUsize::new(0);
        let start = Instant::now();

        cache.get_or_refresh_at(start, || load(&loads)).await.unwrap();
        let later = cache
            .get_or_refresh_at(start + Duration::from_secs(61), || load(&loads))
            .await
            .unwrap();
        assert_eq!(*later, 2);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let cache: TtlCache<usize> = TtlCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_refresh(|| async { Err::<usize, _>("catalog down".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "catalog down");

        let value = cache
            .get_or_refresh(|| async { Ok::<_, String>(7) })
            .await
            .unwrap();
        assert_eq!(*value, 7);
    }
}
