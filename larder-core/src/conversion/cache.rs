use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::locks::{KeyGuard, KeyLocks};
use super::{
    normalize_name, ConversionKey, ConversionRecord, ConversionStore, FactorPair, MemoryStore,
    StoreError,
};

/// Bounded-latency access to a [`ConversionStore`] plus per-key coordination
/// of cache misses.
#[derive(Debug)]
pub struct ConversionCache {
    store: Arc<dyn ConversionStore>,
    timeout: Duration,
    in_flight: KeyLocks,
}

impl ConversionCache {
    pub fn new(store: Arc<dyn ConversionStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            in_flight: KeyLocks::new(),
        }
    }

    /// Cache over a fresh [`MemoryStore`].
    pub fn in_memory(timeout: Duration) -> Self {
        Self::new(Arc::new(MemoryStore::new()), timeout)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{} timed out after {}ms",
                op,
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn record(&self, key: &ConversionKey) -> Result<Option<ConversionRecord>, StoreError> {
        self.bounded("get", self.store.get(key)).await
    }

    /// Factors for `source` and `target` if both are already learned.
    pub async fn lookup(
        &self,
        key: &ConversionKey,
        source: &str,
        target: &str,
    ) -> Result<Option<FactorPair>, StoreError> {
        Ok(self
            .record(key)
            .await?
            .and_then(|record| record.pair(source, target)))
    }

    /// Record a single unit factor.
    pub async fn learn(
        &self,
        key: &ConversionKey,
        unit: &str,
        factor: f64,
    ) -> Result<ConversionRecord, StoreError> {
        self.learn_all(key, &BTreeMap::from([(unit.to_string(), factor)]))
            .await
    }

    /// Record several unit factors at once. Factors must be finite and
    /// positive; nothing is written if any is not.
    pub async fn learn_all(
        &self,
        key: &ConversionKey,
        units: &BTreeMap<String, f64>,
    ) -> Result<ConversionRecord, StoreError> {
        let mut normalized = BTreeMap::new();
        for (unit, factor) in units {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(StoreError::InvalidFactor {
                    unit: unit.clone(),
                    factor: *factor,
                });
            }
            normalized.insert(normalize_name(unit), *factor);
        }

        let record = self.bounded("merge", self.store.merge(key, &normalized)).await?;
        tracing::debug!(
            key = %key,
            units = ?normalized.keys().collect::<Vec<_>>(),
            known = record.units.len(),
            "Learned conversion factors"
        );
        Ok(record)
    }

    /// Serialize misses on one key. Hold the guard across lookup, model call
    /// and learn so concurrent misses ask the model once.
    pub async fn single_flight(&self, key: &ConversionKey) -> KeyGuard<'_> {
        self.in_flight.lock(key).await
    }

    /// Keys with a miss currently being resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;
    use async_trait::async_trait;

    fn cache() -> ConversionCache {
        ConversionCache::in_memory(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_lookup_after_learn() {
        let cache = cache();
        let key = ConversionKey::new("flour", Region::Us);
        assert!(cache.lookup(&key, "cups", "grams").await.unwrap().is_none());

        cache
            .learn_all(
                &key,
                &BTreeMap::from([("cups".to_string(), 1.0), ("grams".to_string(), 120.0)]),
            )
            .await
            .unwrap();

        let pair = cache.lookup(&key, "Cups", "GRAMS").await.unwrap().unwrap();
        assert_eq!(format!("{:.2}", pair.apply(3.0)), "360.00");
        let back = cache.lookup(&key, "grams", "cups").await.unwrap().unwrap();
        assert_eq!(format!("{:.2}", back.apply(100.0)), "0.83");
    }

    #[tokio::test]
    async fn test_learn_same_pair_twice_is_idempotent() {
        let cache = cache();
        let key = ConversionKey::new("flour", Region::Us);
        let first = cache.learn(&key, "cups", 1.0).await.unwrap();
        let second = cache.learn(&key, "cups", 1.0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_factor() {
        let cache = cache();
        let key = ConversionKey::new("flour", Region::Us);
        let err = cache.learn(&key, "cups", 0.0).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFactor { .. }));
        assert!(cache.record(&key).await.unwrap().is_none());

        let err = cache.learn(&key, "cups", f64::NAN).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFactor { .. }));
    }

    #[derive(Debug)]
    struct StalledStore;

    #[async_trait]
    impl ConversionStore for StalledStore {
        async fn get(&self, _key: &ConversionKey) -> Result<Option<ConversionRecord>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn merge(
            &self,
            key: &ConversionKey,
            _units: &BTreeMap<String, f64>,
        ) -> Result<ConversionRecord, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ConversionRecord::empty(key))
        }

        fn backend_name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let cache = ConversionCache::new(Arc::new(StalledStore), Duration::from_millis(20));
        let key = ConversionKey::new("flour", Region::Us);
        let err = cache.lookup(&key, "cups", "grams").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_single_flight_serializes_same_key() {
        let cache = Arc::new(cache());
        let key = ConversionKey::new("flour", Region::Us);
        let other = ConversionKey::new("sugar", Region::Us);

        let guard = cache.single_flight(&key).await;
        // A different key is not blocked.
        let other_guard = cache.single_flight(&other).await;

        let waiter = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move {
                let _guard = cache.single_flight(&key).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        drop(other_guard);
        assert_eq!(cache.in_flight(), 0);
    }
}
