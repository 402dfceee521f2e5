use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use super::model::{
    is_cacheable, BatchProgress, BatchResolution, MappingCacheEntry, MappingSnapshot,
    MappingStatistics, ProviderRef, ResolutionFailure,
};
use crate::constants::DEFAULT_BATCH_DELAY_MS;
use crate::errors::Result;
use crate::resolver::{name_variations, ResolutionResult, TokenResolver};

#[derive(Clone, Debug)]
pub struct MappingCacheConfig {
    /// Pause between two resolver calls in a batch.
    pub batch_delay: Duration,
}

impl Default for MappingCacheConfig {
    fn default() -> Self {
        Self {
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
        }
    }
}

/// Case-insensitive protocol name -> resolution cache in front of a
/// [`TokenResolver`], with lookup statistics.
///
/// Entries live under the trimmed, lower-cased name. Locks are never held
/// across an `.await`.
pub struct MappingCache {
    resolver: Arc<dyn TokenResolver>,
    config: MappingCacheConfig,
    entries: RwLock<HashMap<String, MappingCacheEntry>>,
    stats: Mutex<MappingStatistics>,
}

/// Cache key for a protocol name.
pub fn cache_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl MappingCache {
    pub fn new(resolver: Arc<dyn TokenResolver>, config: MappingCacheConfig) -> Self {
        Self {
            resolver,
            config,
            entries: RwLock::new(HashMap::new()),
            stats: Mutex::new(MappingStatistics::default()),
        }
    }

    // ------------------------------------------------------------------------
    // Lock helpers
    // ------------------------------------------------------------------------

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, MappingCacheEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Mapping cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, MappingCacheEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Mapping cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_stats(&self) -> MutexGuard<'_, MappingStatistics> {
        self.stats.lock().unwrap_or_else(|poisoned| {
            warn!("Mapping statistics lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn cached(&self, key: &str) -> Option<ResolutionResult> {
        self.read_entries().get(key).map(MappingCacheEntry::to_result)
    }

    fn store(&self, key: String, name: &str, result: &ResolutionResult) {
        self.write_entries()
            .insert(key, MappingCacheEntry::from_result(name, result));
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Resolve one name, from cache when possible.
    ///
    /// Empty names yield a failed result and leave the counters alone.
    pub async fn resolve(&self, name: &str) -> Result<ResolutionResult> {
        let key = cache_key(name);
        if key.is_empty() {
            return Ok(ResolutionResult::failed(Vec::new()));
        }

        if let Some(result) = self.cached(&key) {
            self.lock_stats().record_hit();
            debug!("Mapping cache hit for '{}'", name.trim());
            return Ok(result);
        }

        self.lock_stats().record_miss(true);
        let result = self.resolver.resolve(name.trim()).await?;
        if is_cacheable(&result) {
            self.store(key, name, &result);
        } else {
            debug!(
                "Not caching '{}' at confidence {:.2}",
                name.trim(),
                result.confidence
            );
        }
        Ok(result)
    }

    /// Resolve a list of names.
    ///
    /// The first pass answers from the cache only. The second resolves each
    /// distinct remaining name once, in order, pausing `batch_delay` between
    /// resolver calls. A resolver error becomes a failed result for that name
    /// and is not cached. Every distinct failed name is listed in `failures`,
    /// including those answered from the cache. Progress is reported once per input name; a closed
    /// receiver is ignored.
    pub async fn resolve_many(
        &self,
        names: &[String],
        progress: Option<UnboundedSender<BatchProgress>>,
    ) -> BatchResolution {
        let total = names.len();
        let mut completed = 0usize;
        let mut batch = BatchResolution::default();

        let report = |completed: usize, name: &str, from_cache: bool, result: &ResolutionResult| {
            if let Some(tx) = progress.as_ref() {
                let _ = tx.send(BatchProgress {
                    completed,
                    total,
                    name: name.to_string(),
                    from_cache,
                    match_method: result.match_method,
                });
            }
        };

        // Pass one: cache only.
        let mut pending: Vec<(String, &String)> = Vec::new();
        let mut pending_keys: HashSet<String> = HashSet::new();
        let mut failed_keys: HashSet<String> = HashSet::new();
        for name in names {
            let key = cache_key(name);
            if key.is_empty() {
                completed += 1;
                let result = ResolutionResult::failed(Vec::new());
                report(completed, name, false, &result);
                batch.results.insert(name.clone(), result);
                continue;
            }
            if pending_keys.contains(&key) {
                pending.push((key, name));
                continue;
            }
            match self.cached(&key) {
                Some(result) => {
                    self.lock_stats().record_hit();
                    if result.is_failed() && failed_keys.insert(key) {
                        batch.failures.push(ResolutionFailure {
                            name: name.clone(),
                            variations: result.search_variations.clone(),
                            error: None,
                        });
                    }
                    completed += 1;
                    report(completed, name, true, &result);
                    batch.results.insert(name.clone(), result);
                }
                None => {
                    pending_keys.insert(key.clone());
                    pending.push((key, name));
                }
            }
        }

        debug!(
            "Batch of {}: {} answered from cache, {} distinct names to resolve",
            total,
            completed,
            pending_keys.len()
        );

        // Pass two: one resolver call per distinct key.
        let mut resolved: HashMap<String, ResolutionResult> = HashMap::new();
        let mut calls = 0usize;
        for (key, name) in pending {
            let (result, from_cache) = match resolved.get(&key) {
                Some(result) => {
                    // Duplicate of a name resolved earlier in this batch.
                    if self.read_entries().contains_key(&key) {
                        self.lock_stats().record_hit();
                    } else {
                        self.lock_stats().record_miss(false);
                    }
                    (result.clone(), true)
                }
                None => {
                    if calls > 0 && !self.config.batch_delay.is_zero() {
                        tokio::time::sleep(self.config.batch_delay).await;
                    }
                    calls += 1;
                    self.lock_stats().record_miss(true);

                    let result = match self.resolver.resolve(name.trim()).await {
                        Ok(result) => {
                            if is_cacheable(&result) {
                                self.store(key.clone(), name, &result);
                            }
                            if result.is_failed() {
                                batch.failures.push(ResolutionFailure {
                                    name: name.clone(),
                                    variations: result.search_variations.clone(),
                                    error: None,
                                });
                            }
                            result
                        }
                        Err(e) => {
                            warn!("Resolving '{}' failed: {}", name.trim(), e);
                            let variations = name_variations(name);
                            batch.failures.push(ResolutionFailure {
                                name: name.clone(),
                                variations: variations.clone(),
                                error: Some(e.to_string()),
                            });
                            ResolutionResult::failed(variations)
                        }
                    };
                    resolved.insert(key, result.clone());
                    (result, false)
                }
            };

            completed += 1;
            report(completed, name, from_cache, &result);
            batch.results.insert(name.clone(), result);
        }

        info!(
            "Resolved {} names with {} resolver calls, {} failures",
            total,
            calls,
            batch.failures.len()
        );
        batch
    }

    /// Resolve again, ignoring the cache. The stored entry is replaced only
    /// when the new confidence is higher (or nothing was stored); its
    /// revenue-provider annotations are kept.
    pub async fn refresh(&self, name: &str) -> Result<ResolutionResult> {
        let key = cache_key(name);
        if key.is_empty() {
            return Ok(ResolutionResult::failed(Vec::new()));
        }

        self.lock_stats().api_calls += 1;
        let result = self.resolver.resolve(name.trim()).await?;
        if !is_cacheable(&result) {
            return Ok(result);
        }

        let mut entries = self.write_entries();
        match entries.get_mut(&key) {
            Some(existing) if result.confidence > existing.confidence => {
                let mut updated = MappingCacheEntry::from_result(&existing.name, &result);
                updated.defillama = existing.defillama.take();
                updated.quarterly_revenue = existing.quarterly_revenue;
                info!(
                    "Improved mapping for '{}': {:.2} -> {:.2}",
                    existing.name, existing.confidence, result.confidence
                );
                *existing = updated;
            }
            Some(existing) => {
                debug!(
                    "Keeping mapping for '{}' at {:.2}",
                    existing.name, existing.confidence
                );
            }
            None => {
                entries.insert(key, MappingCacheEntry::from_result(name, &result));
            }
        }
        Ok(result)
    }

    /// Attach the revenue provider's identity to a cached entry. Returns
    /// false when the name is not cached.
    pub fn annotate(&self, name: &str, provider: ProviderRef) -> bool {
        match self.write_entries().get_mut(&cache_key(name)) {
            Some(entry) => {
                entry.defillama = Some(provider);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<MappingCacheEntry> {
        self.read_entries().get(&cache_key(name)).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<MappingCacheEntry> {
        self.write_entries().remove(&cache_key(name))
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    pub fn statistics(&self) -> MappingStatistics {
        *self.lock_stats()
    }

    pub fn reset_statistics(&self) {
        self.lock_stats().reset();
        info!("Mapping statistics reset");
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Current entries and statistics in their on-disk form.
    pub fn export_snapshot(&self) -> MappingSnapshot {
        let mappings: BTreeMap<String, MappingCacheEntry> = self
            .read_entries()
            .values()
            .map(|entry| (entry.name.clone(), entry.clone()))
            .collect();
        MappingSnapshot::new(mappings, self.statistics())
    }

    /// Seed the cache from a snapshot. Entries are keyed by their map key,
    /// falling back to the stored name when the key is blank. Keys that
    /// differ only in case are folded into one entry, keeping the most
    /// confident. Listed tokenless
    /// protocols without an entry get one. Saved statistics are added to the
    /// current counters. Returns the number of entries now cached.
    pub fn load_snapshot(&self, snapshot: MappingSnapshot) -> usize {
        let mut folded = 0usize;
        {
            let mut entries = self.write_entries();

            for (stored_key, mut entry) in snapshot.mappings {
                let mut key = cache_key(&stored_key);
                if key.is_empty() {
                    key = cache_key(&entry.name);
                } else if cache_key(&entry.name) != key {
                    // The map key is what lookups were made with.
                    debug!(
                        "Mapping '{}' stored under '{}', using the key",
                        entry.name, stored_key
                    );
                    entry.name = stored_key.trim().to_string();
                }
                if key.is_empty() {
                    continue;
                }
                match entries.get(&key) {
                    Some(existing) if existing.confidence >= entry.confidence => folded += 1,
                    Some(_) => {
                        folded += 1;
                        entries.insert(key, entry);
                    }
                    None => {
                        entries.insert(key, entry);
                    }
                }
            }

            for name in snapshot.tokenless_protocols {
                let key = cache_key(&name);
                if key.is_empty() || entries.contains_key(&key) {
                    continue;
                }
                entries.insert(
                    key,
                    MappingCacheEntry::from_result(&name, &ResolutionResult::failed(Vec::new())),
                );
            }
        }

        self.lock_stats().absorb(&snapshot.statistics.counters);

        let count = self.len();
        if folded > 0 {
            debug!("Folded {} duplicate mapping keys", folded);
        }
        info!("Loaded {} protocol mappings", count);
        count
    }
}
