//! Tests for MappingCache lookups, batching, statistics and snapshots.
//!
//! # Contract Points
//!
//! 1. Accepted and definitively failed resolutions are served from cache
//! 2. Low-confidence resolutions are never cached
//! 3. Batch resolution calls the resolver at most once per distinct uncached name
//! 4. Snapshots fold case-variant keys into one entry

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use protocap_market_data::{Coin, MarketDataError};

use super::*;
use crate::errors::{Error, Result};
use crate::resolver::{MatchMethod, ResolutionResult, TokenResolver};

// =========================================================================
// Mock TokenResolver
// =========================================================================

#[derive(Clone, Default)]
struct MockResolver {
    /// Lower-cased name -> canned result. Unknown names fail.
    answers: Arc<Mutex<HashMap<String, ResolutionResult>>>,
    /// Lower-cased names that make the resolver error out.
    errors: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    fn new() -> Self {
        Self::default()
    }

    fn answer(&self, name: &str, result: ResolutionResult) {
        self.answers
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), result);
    }

    fn fail_on(&self, name: &str) {
        self.errors.lock().unwrap().push(name.to_lowercase());
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TokenResolver for MockResolver {
    async fn resolve(&self, name: &str) -> Result<ResolutionResult> {
        self.calls.lock().unwrap().push(name.to_string());
        let key = name.to_lowercase();
        if self.errors.lock().unwrap().contains(&key) {
            return Err(Error::MarketData(MarketDataError::Timeout {
                provider: "COINGECKO".to_string(),
            }));
        }
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ResolutionResult::failed(vec![key.clone()])))
    }
}

fn matched(id: &str, symbol: &str, name: &str, method: MatchMethod) -> ResolutionResult {
    ResolutionResult::matched(Coin::new(id, symbol, name), method, vec![name.to_lowercase()])
}

fn weak(id: &str) -> ResolutionResult {
    ResolutionResult {
        coin: Some(Coin::new(id, id, id)),
        confidence: 0.2,
        match_method: MatchMethod::Fuzzy,
        search_variations: vec![id.to_string()],
    }
}

fn cache_with(resolver: &MockResolver) -> MappingCache {
    MappingCache::new(
        Arc::new(resolver.clone()),
        MappingCacheConfig {
            batch_delay: Duration::ZERO,
        },
    )
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =========================================================================
// resolve
// =========================================================================

#[tokio::test]
async fn test_accepted_result_is_served_from_cache() {
    let resolver = MockResolver::new();
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    let cache = cache_with(&resolver);

    let first = cache.resolve("Aave").await.unwrap();
    let second = cache.resolve("  aave ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(resolver.call_count(), 1);

    let stats = cache.statistics();
    assert_eq!(stats.total_lookups, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.api_calls, 1);
    assert_eq!(stats.cache_hit_rate(), 0.5);
}

#[tokio::test]
async fn test_failed_result_is_cached_as_tokenless() {
    let resolver = MockResolver::new();
    let cache = cache_with(&resolver);

    let result = cache.resolve("Tether").await.unwrap();
    assert!(result.is_failed());
    assert!(cache.get("TETHER").unwrap().is_tokenless);

    let again = cache.resolve("tether").await.unwrap();
    assert!(again.is_failed());
    assert_eq!(resolver.call_count(), 1);
}

#[tokio::test]
async fn test_low_confidence_is_not_cached() {
    let resolver = MockResolver::new();
    resolver.answer("Vague", weak("vague-token"));
    let cache = cache_with(&resolver);

    cache.resolve("Vague").await.unwrap();
    cache.resolve("Vague").await.unwrap();

    assert_eq!(resolver.call_count(), 2);
    assert!(cache.is_empty());
    let stats = cache.statistics();
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.api_calls, 2);
}

#[tokio::test]
async fn test_empty_name_touches_nothing() {
    let resolver = MockResolver::new();
    let cache = cache_with(&resolver);

    let result = cache.resolve("   ").await.unwrap();

    assert!(result.is_failed());
    assert_eq!(resolver.call_count(), 0);
    assert_eq!(cache.statistics(), MappingStatistics::default());
}

#[tokio::test]
async fn test_resolver_error_propagates_and_is_not_cached() {
    let resolver = MockResolver::new();
    resolver.fail_on("Aave");
    let cache = cache_with(&resolver);

    assert!(cache.resolve("Aave").await.is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.statistics().api_calls, 1);
}

// =========================================================================
// resolve_many
// =========================================================================

#[tokio::test]
async fn test_resolve_many_calls_resolver_once_per_distinct_uncached_name() {
    let resolver = MockResolver::new();
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    resolver.answer("Uniswap", matched("uniswap", "uni", "Uniswap", MatchMethod::ExactName));
    resolver.answer("Lido", matched("lido-dao", "ldo", "Lido DAO", MatchMethod::ExactId));
    let cache = cache_with(&resolver);

    cache.resolve("Aave").await.unwrap();
    assert_eq!(resolver.call_count(), 1);

    let input = names(&["Aave", "Uniswap", "uniswap", "Lido", "Unknown", "Aave"]);
    let batch = cache.resolve_many(&input, None).await;

    // Uniswap, Lido and Unknown are the distinct uncached names.
    assert_eq!(resolver.call_count(), 1 + 3);
    for name in &input {
        assert!(batch.results.contains_key(name), "missing result for {}", name);
    }
    assert_eq!(batch.results["uniswap"].coin_id(), Some("uniswap"));
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].name, "Unknown");
    assert!(batch.failures[0].error.is_none());

    let stats = cache.statistics();
    assert_eq!(stats.total_lookups, 1 + input.len() as u64);
    assert_eq!(stats.api_calls, 4);
}

#[tokio::test]
async fn test_resolve_many_reports_progress_per_name() {
    let resolver = MockResolver::new();
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    let cache = cache_with(&resolver);
    cache.resolve("Aave").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let input = names(&["Aave", "Curve", "Pendle"]);
    cache.resolve_many(&input, Some(tx)).await;

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].name, "Aave");
    assert!(events[0].from_cache);
    assert_eq!(
        events.iter().map(|e| e.completed).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(events.iter().all(|e| e.total == 3));
}

#[tokio::test]
async fn test_resolve_many_turns_errors_into_failures() {
    let resolver = MockResolver::new();
    resolver.fail_on("Broken Protocol");
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    let cache = cache_with(&resolver);

    let batch = cache
        .resolve_many(&names(&["Broken Protocol", "Aave"]), None)
        .await;

    assert!(batch.results["Broken Protocol"].is_failed());
    assert_eq!(batch.failures.len(), 1);
    assert!(batch.failures[0].error.is_some());
    assert_eq!(batch.failures[0].variations[0], "broken protocol");

    // Errors are not cached, successes are.
    assert!(cache.get("broken protocol").is_none());
    assert!(cache.get("aave").is_some());
}

#[tokio::test]
async fn test_resolve_many_lists_cached_failures() {
    let resolver = MockResolver::new();
    let cache = cache_with(&resolver);

    let first = cache.resolve_many(&names(&["Zzz Unknown"]), None).await;
    assert_eq!(first.failures.len(), 1);

    let input = names(&["Zzz Unknown", "zzz unknown"]);
    let second = cache.resolve_many(&input, None).await;

    assert_eq!(resolver.call_count(), 1);
    assert!(second.results["zzz unknown"].is_failed());
    assert_eq!(second.failures.len(), 1);
    assert_eq!(second.failures[0].name, "Zzz Unknown");
    assert_eq!(second.failures[0].variations, vec!["zzz unknown".to_string()]);
    assert!(second.failures[0].error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_resolve_many_paces_resolver_calls() {
    let resolver = MockResolver::new();
    let cache = MappingCache::new(
        Arc::new(resolver.clone()),
        MappingCacheConfig {
            batch_delay: Duration::from_millis(100),
        },
    );

    let started = tokio::time::Instant::now();
    cache
        .resolve_many(&names(&["One", "Two", "Three"]), None)
        .await;

    assert_eq!(resolver.call_count(), 3);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

// =========================================================================
// refresh / annotate
// =========================================================================

#[tokio::test]
async fn test_refresh_only_improves() {
    let resolver = MockResolver::new();
    resolver.answer("Ondo", matched("ondo-finance", "ondo", "Ondo Finance", MatchMethod::Fuzzy));
    let cache = cache_with(&resolver);
    cache.resolve("Ondo").await.unwrap();
    cache.annotate(
        "ondo",
        ProviderRef {
            slug: "ondo-finance".to_string(),
            name: "Ondo Finance".to_string(),
        },
    );

    resolver.answer("Ondo", matched("ondo-finance", "ondo", "Ondo", MatchMethod::ExactName));
    cache.refresh("Ondo").await.unwrap();

    let entry = cache.get("ondo").unwrap();
    assert_eq!(entry.match_method, MatchMethod::ExactName);
    assert_eq!(entry.defillama.as_ref().unwrap().slug, "ondo-finance");

    // A worse answer leaves the entry alone.
    resolver.answer("Ondo", matched("ondo-x", "ondox", "Ondo X", MatchMethod::Partial));
    cache.refresh("Ondo").await.unwrap();
    assert_eq!(cache.get("ondo").unwrap().coingecko_id.as_deref(), Some("ondo-finance"));
}

#[tokio::test]
async fn test_annotate_missing_entry() {
    let cache = cache_with(&MockResolver::new());
    let annotated = cache.annotate(
        "Nope",
        ProviderRef {
            slug: "nope".to_string(),
            name: "Nope".to_string(),
        },
    );
    assert!(!annotated);
}

#[tokio::test]
async fn test_remove_and_reset_statistics() {
    let resolver = MockResolver::new();
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    let cache = cache_with(&resolver);
    cache.resolve("Aave").await.unwrap();

    assert!(cache.remove("AAVE").is_some());
    assert_eq!(cache.len(), 0);

    cache.reset_statistics();
    assert_eq!(cache.statistics().cache_hit_rate(), 0.0);
    assert_eq!(cache.statistics().total_lookups, 0);
}

// =========================================================================
// Snapshots
// =========================================================================

#[tokio::test]
async fn test_snapshot_round_trip_through_file() {
    let resolver = MockResolver::new();
    resolver.answer("Aave", matched("aave", "aave", "Aave", MatchMethod::ExactName));
    let cache = cache_with(&resolver);
    cache.resolve("Aave").await.unwrap();
    cache.resolve("Tether").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("mappings.json");
    assert_eq!(cache.save(&path).unwrap(), 2);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["totalProtocols"], 2);
    assert_eq!(json["tokenlessProtocols"][0], "Tether");
    assert_eq!(json["mappings"]["Aave"]["coingeckoId"], "aave");

    let fresh_resolver = MockResolver::new();
    let restored = cache_with(&fresh_resolver);
    assert_eq!(restored.load(&path).unwrap(), 2);

    let result = restored.resolve("aave").await.unwrap();
    assert_eq!(result.coin_id(), Some("aave"));
    assert_eq!(fresh_resolver.call_count(), 0);
}

#[test]
fn test_load_folds_legacy_dual_keys() {
    let json = r#"{
        "version": "1.0",
        "generatedAt": "2024-05-01T00:00:00Z",
        "totalProtocols": 1,
        "mappings": {
            "Aave": {"name": "Aave", "coingeckoId": "aave", "symbol": "aave", "confidence": 1.0,
                     "matchMethod": "exact-name", "isTokenless": false, "variationsTried": ["aave"],
                     "lastVerified": "2024-05-01T00:00:00Z"},
            "aave": {"name": "aave", "coingeckoId": "aave", "symbol": "aave", "confidence": 0.95,
                     "matchMethod": "exact-id", "isTokenless": false, "variationsTried": ["aave"],
                     "lastVerified": "2024-05-01T00:00:00Z"}
        },
        "tokenlessProtocols": ["Phantom"],
        "statistics": {"totalLookups": 10, "cacheHits": 4, "cacheMisses": 6, "apiCalls": 6, "cacheHitRate": 0.4}
    }"#;
    let snapshot: MappingSnapshot = serde_json::from_str(json).unwrap();

    let cache = cache_with(&MockResolver::new());
    assert_eq!(cache.load_snapshot(snapshot), 2);

    let entry = cache.get("AAVE").unwrap();
    assert_eq!(entry.match_method, MatchMethod::ExactName);
    assert!(cache.get("phantom").unwrap().is_tokenless);
    assert_eq!(cache.statistics().total_lookups, 10);
}

#[test]
fn test_load_keys_entries_by_map_key() {
    let json = r#"{
        "version": "1.0",
        "generatedAt": "2024-05-01T00:00:00Z",
        "totalProtocols": 1,
        "mappings": {
            "PancakeSwap AMM": {"name": "PancakeSwap", "coingeckoId": "pancakeswap-token",
                     "symbol": "cake", "confidence": 0.8, "matchMethod": "symbol",
                     "isTokenless": false, "variationsTried": ["cake"],
                     "lastVerified": "2024-05-01T00:00:00Z"}
        },
        "tokenlessProtocols": [],
        "statistics": {"totalLookups": 0, "cacheHits": 0, "cacheMisses": 0, "apiCalls": 0, "cacheHitRate": 0.0}
    }"#;
    let snapshot: MappingSnapshot = serde_json::from_str(json).unwrap();

    let cache = cache_with(&MockResolver::new());
    assert_eq!(cache.load_snapshot(snapshot), 1);

    let entry = cache.get("pancakeswap amm").unwrap();
    assert_eq!(entry.coingecko_id.as_deref(), Some("pancakeswap-token"));
    assert!(cache.get("pancakeswap").is_none());

    // Exported again under the same key.
    let exported = cache.export_snapshot();
    assert!(exported.mappings.contains_key("PancakeSwap AMM"));
}

#[test]
fn test_load_rejects_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "").unwrap();

    let cache = cache_with(&MockResolver::new());
    assert!(matches!(cache.load(&path), Err(Error::Snapshot(_))));
}
