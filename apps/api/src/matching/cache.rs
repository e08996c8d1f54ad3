//! Embedding Cache: per-invocation memoization of provider calls.
//!
//! One instance per scoring invocation; dropped with it. Each distinct text unit
//! reaches the provider at most once: concurrent callers for the same key await
//! the single in-flight request. Distinct keys run concurrently up to a cap, and
//! every provider call is bounded by a timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OnceCell, Semaphore};
use tracing::debug;

use crate::embedding_client::{EmbeddingError, EmbeddingProvider, EmbeddingVector};
use crate::matching::similarity::l2_normalize;
use crate::matching::ScoringError;

type Slot = Arc<OnceCell<Arc<EmbeddingVector>>>;

pub struct EmbeddingCache<'p> {
    provider: &'p dyn EmbeddingProvider,
    slots: Mutex<HashMap<String, Slot>>,
    permits: Semaphore,
    timeout: Duration,
    provider_calls: AtomicUsize,
}

impl<'p> EmbeddingCache<'p> {
    pub fn new(
        provider: &'p dyn EmbeddingProvider,
        max_in_flight: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            slots: Mutex::new(HashMap::new()),
            permits: Semaphore::new(max_in_flight.max(1)),
            timeout,
            provider_calls: AtomicUsize::new(0),
        }
    }

    /// Returns the unit-length embedding for `text`, calling the provider only on first use.
    pub async fn get(&self, text: &str) -> Result<Arc<EmbeddingVector>, ScoringError> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(text.to_string()).or_default())
        };

        let vector = slot.get_or_try_init(|| self.fetch(text)).await?;
        Ok(Arc::clone(vector))
    }

    async fn fetch(&self, text: &str) -> Result<Arc<EmbeddingVector>, ScoringError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            EmbeddingError::Config("embedding request limiter closed".to_string())
        })?;

        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Embedding {} chars via {} provider",
            text.chars().count(),
            self.provider.name()
        );

        let mut vector = tokio::time::timeout(self.timeout, self.provider.embed(text))
            .await
            .map_err(|_| ScoringError::EmbeddingTimeout {
                chars: text.chars().count(),
                timeout: self.timeout,
            })??;

        if vector.is_empty() {
            let reason = "provider returned an empty vector".to_string();
            return Err(EmbeddingError::MalformedVector(reason).into());
        }
        if vector.iter().any(|v| !v.is_finite()) {
            let reason = "provider returned non-finite values".to_string();
            return Err(EmbeddingError::MalformedVector(reason).into());
        }

        l2_normalize(&mut vector);
        Ok(Arc::new(vector))
    }

    /// Number of provider calls made by this cache so far.
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Number of text units with a cached vector.
    pub fn cached_texts(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }
}
