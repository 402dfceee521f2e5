//! Property-based integration tests for name cleaning and the mapping cache.
//!
//! These tests verify that universal properties hold across generated
//! protocol names, using the `proptest` crate for random test case
//! generation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proptest::prelude::*;
use protocap_core::{
    clean_name, name_variations, MappingCache, MappingCacheConfig, MatchMethod, ResolutionResult,
    Result, TokenResolver,
};
use protocap_market_data::Coin;

// =============================================================================
// Generators
// =============================================================================

/// Generates a protocol-like name of one to four lowercase words.
fn arb_protocol_name() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,8}", 1..=4).prop_map(|words| words.join(" "))
}

/// Generates a name from a small pool, in random letter case, so that
/// sequences revisit the same protocol.
fn arb_repeated_name() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just("Aave"),
            Just("Uniswap"),
            Just("Phantom Wallet"),
            Just("Lido"),
            Just("Ondo Finance"),
        ],
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(name, upper, padded)| {
            let name = if upper {
                name.to_uppercase()
            } else {
                name.to_string()
            };
            if padded {
                format!("  {} ", name)
            } else {
                name
            }
        })
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolver that maps any name containing "wallet" to a failure and every
/// other name to an exact match, counting calls.
#[derive(Default)]
struct CountingResolver {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenResolver for CountingResolver {
    async fn resolve(&self, name: &str) -> Result<ResolutionResult> {
        self.calls.lock().unwrap().push(name.to_string());
        let lower = name.to_lowercase();
        if lower.contains("wallet") {
            return Ok(ResolutionResult::failed(vec![lower]));
        }
        let id = lower.replace(' ', "-");
        Ok(ResolutionResult::matched(
            Coin::new(id.clone(), id, name),
            MatchMethod::ExactName,
            vec![lower],
        ))
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn cache(resolver: Arc<CountingResolver>) -> MappingCache {
    MappingCache::new(
        resolver,
        MappingCacheConfig {
            batch_delay: Duration::ZERO,
        },
    )
}

// =============================================================================
// Name Properties
// =============================================================================

proptest! {
    /// Cleaning never reduces a name with letters to nothing.
    #[test]
    fn prop_clean_name_keeps_a_word(name in arb_protocol_name()) {
        let cleaned = clean_name(&name);
        prop_assert!(!cleaned.is_empty());
        prop_assert!(cleaned.split(' ').all(|w| name.split(' ').any(|n| n == w)));
    }

    /// Variations start with the normalized name and never repeat.
    #[test]
    fn prop_variations_unique_and_raw_first(name in arb_protocol_name()) {
        let variations = name_variations(&name);
        prop_assert_eq!(variations.first().map(String::as_str), Some(name.as_str()));

        let distinct: HashSet<&String> = variations.iter().collect();
        prop_assert_eq!(distinct.len(), variations.len());
        prop_assert!(variations.iter().all(|v| !v.trim().is_empty()));
    }

    /// Case and surrounding whitespace do not change the variations.
    #[test]
    fn prop_variations_ignore_case(name in arb_protocol_name()) {
        let shouted = format!("  {}  ", name.to_uppercase());
        prop_assert_eq!(name_variations(&name), name_variations(&shouted));
    }
}

// =============================================================================
// Cache Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Counters stay consistent and each distinct protocol reaches the
    /// resolver exactly once, whatever the lookup order.
    #[test]
    fn prop_statistics_consistent(names in proptest::collection::vec(arb_repeated_name(), 0..30)) {
        let resolver = Arc::new(CountingResolver::default());
        let cache = cache(resolver.clone());

        runtime().block_on(async {
            for name in &names {
                cache.resolve(name).await.unwrap();
            }
        });

        let stats = cache.statistics();
        let distinct: HashSet<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();

        prop_assert_eq!(stats.total_lookups, names.len() as u64);
        prop_assert_eq!(stats.cache_hits + stats.cache_misses, stats.total_lookups);
        prop_assert_eq!(stats.cache_misses, distinct.len() as u64);
        prop_assert_eq!(stats.api_calls, stats.cache_misses);
        prop_assert_eq!(resolver.calls.lock().unwrap().len(), distinct.len());
        prop_assert_eq!(cache.len(), distinct.len());

        let rate = stats.cache_hit_rate();
        prop_assert!((0.0..=1.0).contains(&rate));
        if names.is_empty() {
            prop_assert_eq!(rate, 0.0);
        }
    }

    /// A batch resolves each distinct protocol once and reports on every
    /// input name.
    #[test]
    fn prop_batch_resolves_each_key_once(names in proptest::collection::vec(arb_repeated_name(), 1..20)) {
        let resolver = Arc::new(CountingResolver::default());
        let cache = cache(resolver.clone());

        let batch = runtime().block_on(cache.resolve_many(&names, None));

        let distinct: HashSet<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        prop_assert_eq!(resolver.calls.lock().unwrap().len(), distinct.len());
        for name in &names {
            prop_assert!(batch.results.contains_key(name));
        }

        let stats = cache.statistics();
        prop_assert_eq!(stats.total_lookups, names.len() as u64);
        prop_assert_eq!(stats.api_calls, distinct.len() as u64);
    }

    /// Once cached, a protocol is answered without reaching the resolver.
    #[test]
    fn prop_cached_lookup_skips_resolver(name in arb_repeated_name(), repeats in 1usize..6) {
        let resolver = Arc::new(CountingResolver::default());
        let cache = cache(resolver.clone());

        let (first, rest) = runtime().block_on(async {
            let first = cache.resolve(&name).await.unwrap();
            let mut rest = Vec::new();
            for _ in 0..repeats {
                rest.push(cache.resolve(&name.to_lowercase()).await.unwrap());
            }
            (first, rest)
        });

        prop_assert_eq!(resolver.calls.lock().unwrap().len(), 1);
        prop_assert_eq!(cache.statistics().cache_hits, repeats as u64);
        for result in rest {
            prop_assert_eq!(result.coin_id(), first.coin_id());
            prop_assert_eq!(result.is_failed(), first.is_failed());
        }
    }
}
