use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::AsyncMemoTable;

/// A read-through cache: values come from a [`Source`] the first time a key is asked for and
/// are served from memory afterwards.
pub struct Cache<K, V> {
    table: AsyncMemoTable<K, V>,
    source: Arc<dyn Source<K, V> + Send + Sync>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(source: impl Source<K, V> + Send + Sync + 'static) -> Self {
        Self {
            table: AsyncMemoTable::new(),
            source: Arc::new(source),
        }
    }

    /// Returns the value for `key`, fetching it from the source if it isn't cached yet.
    ///
    /// Concurrent callers for the same key share one fetch. A failed fetch caches nothing.
    pub async fn get(&self, key: &K) -> anyhow::Result<V> {
        let source = &self.source;
        self.table
            .get_or_try_compute(key.clone(), async move {
                source
                    .fetch(key)
                    .await
                    .with_context(|| format!("fetching {key:?}"))
            })
            .await
    }

    /// Returns the cached value for `key` without touching the source.
    pub async fn get_if_present(&self, key: &K) -> Option<V> {
        self.table.get(key).await
    }

    pub async fn len(&self) -> usize {
        self.table.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.table.is_empty().await
    }
}

/// Where a [`Cache`] loads missing values from.
#[async_trait]
pub trait Source<K, V> {
    async fn fetch(&self, key: &K) -> anyhow::Result<V>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct TestSource {
        fetches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Source<i32, String> for TestSource {
        async fn fetch(&self, key: &i32) -> anyhow::Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(5)).await;
            if *key < 0 {
                anyhow::bail!("negative key");
            }
            Ok(format!("value-{key}"))
        }
    }

    #[tokio::test]
    async fn fetches_once_per_key() {
        let source = TestSource::default();
        let fetches = source.fetches.clone();
        let cache = Cache::new(source);

        assert_eq!(cache.get(&12).await.unwrap(), "value-12");
        assert_eq!(cache.get(&12).await.unwrap(), "value-12");
        assert_eq!(cache.get(&13).await.unwrap(), "value-13");

        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_gets_share_one_fetch() {
        let source = TestSource::default();
        let fetches = source.fetches.clone();
        let cache = Arc::new(Cache::new(source));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get(&7).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "value-7");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let source = TestSource::default();
        let fetches = source.fetches.clone();
        let cache = Cache::new(source);

        let err = cache.get(&-1).await.unwrap_err();
        assert_eq!(err.to_string(), "fetching -1");
        assert_eq!(err.root_cause().to_string(), "negative key");
        assert_eq!(cache.get_if_present(&-1).await, None);

        assert!(cache.get(&-1).await.is_err());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn get_if_present_does_not_fetch() {
        let source = TestSource::default();
        let fetches = source.fetches.clone();
        let cache = Cache::new(source);

        assert_eq!(cache.get_if_present(&1).await, None);
        assert_eq!(fetches.load(Ordering::SeqCst), 0);

        cache.get(&1).await.unwrap();
        assert_eq!(cache.get_if_present(&1).await, Some("value-1".to_string()));
    }
}
