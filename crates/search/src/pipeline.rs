use crate::cache::{CacheKey, ResultCache, DEFAULT_CACHE_CAPACITY};
use crate::error::{Result, SearchError};
use crate::intent::BoostPlan;
use crate::rerank::{RankedHit, RerankEngine};
use scout_engine::Engine;
use scout_protocol::{normalize_hits, SearchHit};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Candidates requested from the engine per returned hit.
const OVERFETCH_FACTOR: usize = 3;
const MAX_FETCH: usize = 100;

/// Cache, engine, normalize, rerank.
pub struct SearchPipeline {
    engine: Arc<dyn Engine>,
    cache: Mutex<ResultCache<Arc<Vec<SearchHit>>>>,
    /// Bumped by every clear; fetches started under an older epoch are not cached.
    epoch: AtomicU64,
    rerank: RerankEngine,
}

impl SearchPipeline {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_capacity(engine, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(engine: Arc<dyn Engine>, capacity: usize) -> Self {
        Self {
            engine,
            cache: Mutex::new(ResultCache::new(capacity)),
            epoch: AtomicU64::new(0),
            rerank: RerankEngine::default(),
        }
    }

    #[must_use]
    pub fn with_rerank(mut self, rerank: RerankEngine) -> Self {
        self.rerank = rerank;
        self
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn rerank_engine(&self) -> &RerankEngine {
        &self.rerank
    }

    /// Normalized, pre-rerank hits for `(query, limit)`; served from the cache when present.
    pub async fn raw_hits(&self, query: &str, limit: usize) -> Result<Arc<Vec<SearchHit>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let key = CacheKey::new(query, limit);
        let cached = self.lock_cache().get(&key);
        if let Some(hits) = cached {
            log::debug!("Cache hit: query='{}', limit={}", query, limit);
            return Ok(hits);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let fetch = limit
            .saturating_mul(OVERFETCH_FACTOR)
            .clamp(limit.max(1), MAX_FETCH.max(limit));
        let raw = self.engine.search(query, fetch).await?;
        let hits = Arc::new(normalize_hits(&raw));
        log::debug!(
            "Engine search: query='{}', fetched={}, hits={}",
            query,
            fetch,
            hits.len()
        );

        let mut cache = self.lock_cache();
        if self.epoch.load(Ordering::SeqCst) == epoch {
            cache.put(key, Arc::clone(&hits));
        } else {
            log::debug!("Cache cleared during search for '{}'; not caching", query);
        }
        Ok(hits)
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        plan: &BoostPlan,
    ) -> Result<Vec<RankedHit>> {
        let hits = self.raw_hits(query, limit).await?;
        Ok(self.rerank.rerank_with_plan(&hits, query, plan, limit))
    }

    pub fn clear_cache(&self) {
        let mut cache = self.lock_cache();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResultCache<Arc<Vec<SearchHit>>>> {
        // A poisoned cache only ever holds complete entries.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
