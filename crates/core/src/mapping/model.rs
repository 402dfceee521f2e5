//! Persisted mapping records, statistics and snapshot format.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use protocap_market_data::Coin;

use crate::constants::{ACCEPTANCE_THRESHOLD, SNAPSHOT_VERSION};
use crate::resolver::{MatchMethod, ResolutionResult};

/// Protocol identity on the revenue provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRef {
    pub slug: String,
    pub name: String,
}

/// Cached resolution of one protocol name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingCacheEntry {
    /// Protocol name as first seen (display case).
    pub name: String,
    pub coingecko_id: Option<String>,
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    pub confidence: f64,
    pub match_method: MatchMethod,
    /// Definitive negative: the protocol has no token.
    #[serde(default)]
    pub is_tokenless: bool,
    #[serde(default)]
    pub variations_tried: Vec<String>,
    pub last_verified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defillama: Option<ProviderRef>,
}

impl MappingCacheEntry {
    pub fn from_result(name: &str, result: &ResolutionResult) -> Self {
        let coin = result.coin.as_ref();
        Self {
            name: name.trim().to_string(),
            coingecko_id: coin.map(|c| c.id.clone()),
            symbol: coin.map(|c| c.symbol.clone()),
            token_name: coin.map(|c| c.name.clone()),
            confidence: result.confidence,
            match_method: result.match_method,
            is_tokenless: result.is_failed(),
            variations_tried: result.search_variations.clone(),
            last_verified: Utc::now(),
            quarterly_revenue: None,
            defillama: None,
        }
    }

    /// Rebuild the resolution this entry was made from.
    pub fn to_result(&self) -> ResolutionResult {
        let coin = match (&self.coingecko_id, &self.symbol) {
            (Some(id), Some(symbol)) if !self.is_tokenless => Some(Coin::new(
                id.clone(),
                symbol.clone(),
                self.token_name.clone().unwrap_or_else(|| id.clone()),
            )),
            _ => None,
        };

        match coin {
            Some(coin) => ResolutionResult {
                coin: Some(coin),
                confidence: self.confidence,
                match_method: self.match_method,
                search_variations: self.variations_tried.clone(),
            },
            None => ResolutionResult::failed(self.variations_tried.clone()),
        }
    }
}

/// Whether a resolution may be stored: accepted matches and definitive
/// failures are kept, low-confidence matches are retried next time.
pub fn is_cacheable(result: &ResolutionResult) -> bool {
    result.is_failed() || result.confidence >= ACCEPTANCE_THRESHOLD
}

/// Lookup counters. Only [`reset`](Self::reset) lowers them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingStatistics {
    pub total_lookups: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub api_calls: u64,
}

impl MappingStatistics {
    /// `cache_hits / total_lookups`, or 0 before the first lookup.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_lookups as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.total_lookups += 1;
        self.cache_hits += 1;
    }

    pub(crate) fn record_miss(&mut self, api_call: bool) {
        self.total_lookups += 1;
        self.cache_misses += 1;
        if api_call {
            self.api_calls += 1;
        }
    }

    pub(crate) fn absorb(&mut self, other: &MappingStatistics) {
        self.total_lookups += other.total_lookups;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.api_calls += other.api_calls;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Statistics block of a snapshot, with the derived hit rate spelled out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStatistics {
    #[serde(flatten)]
    pub counters: MappingStatistics,
    #[serde(default)]
    pub cache_hit_rate: f64,
}

impl From<MappingStatistics> for SnapshotStatistics {
    fn from(counters: MappingStatistics) -> Self {
        Self {
            cache_hit_rate: counters.cache_hit_rate(),
            counters,
        }
    }
}

/// On-disk form of the mapping cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSnapshot {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub total_protocols: usize,
    /// Keyed by display name, one per protocol. Older files may carry the
    /// same protocol under several keys.
    pub mappings: BTreeMap<String, MappingCacheEntry>,
    #[serde(default)]
    pub tokenless_protocols: Vec<String>,
    #[serde(default)]
    pub statistics: SnapshotStatistics,
}

impl MappingSnapshot {
    pub fn new(
        mappings: BTreeMap<String, MappingCacheEntry>,
        statistics: MappingStatistics,
    ) -> Self {
        let tokenless_protocols = mappings
            .values()
            .filter(|entry| entry.is_tokenless)
            .map(|entry| entry.name.clone())
            .collect();
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            generated_at: Utc::now(),
            total_protocols: mappings.len(),
            mappings,
            tokenless_protocols,
            statistics: statistics.into(),
        }
    }
}

/// Progress of a batch resolution, one event per input name.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// Names handled so far, including this one.
    pub completed: usize,
    pub total: usize,
    pub name: String,
    pub from_cache: bool,
    pub match_method: MatchMethod,
}

/// Name that could not be mapped to a token.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionFailure {
    pub name: String,
    pub variations: Vec<String>,
    /// Set when resolution itself failed; `None` for a definitive no-match.
    pub error: Option<String>,
}

/// Outcome of [`MappingCache::resolve_many`](super::MappingCache::resolve_many).
#[derive(Clone, Debug, Default)]
pub struct BatchResolution {
    /// One entry per distinct input name (as given).
    pub results: std::collections::HashMap<String, ResolutionResult>,
    pub failures: Vec<ResolutionFailure>,
}
