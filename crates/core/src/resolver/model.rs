//! Resolution result types.

use serde::{Deserialize, Serialize};

use protocap_market_data::Coin;

use crate::constants::ACCEPTANCE_THRESHOLD;

/// How a token was matched, ordered by descending reliability.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    ExactName,
    ExactId,
    Symbol,
    Partial,
    Fuzzy,
    Failed,
}

impl MatchMethod {
    /// Fixed confidence attached to the tier.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::ExactName => 1.0,
            Self::ExactId => 0.95,
            Self::Symbol => 0.80,
            Self::Partial => 0.60,
            Self::Fuzzy => 0.40,
            Self::Failed => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactName => "exact-name",
            Self::ExactId => "exact-id",
            Self::Symbol => "symbol",
            Self::Partial => "partial",
            Self::Fuzzy => "fuzzy",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one protocol name. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub coin: Option<Coin>,
    /// In [0, 1]; always the confidence of `match_method`.
    pub confidence: f64,
    pub match_method: MatchMethod,
    /// Candidates tried, in order.
    pub search_variations: Vec<String>,
}

impl ResolutionResult {
    pub fn matched(coin: Coin, method: MatchMethod, search_variations: Vec<String>) -> Self {
        Self {
            coin: Some(coin),
            confidence: method.confidence(),
            match_method: method,
            search_variations,
        }
    }

    pub fn failed(search_variations: Vec<String>) -> Self {
        Self {
            coin: None,
            confidence: 0.0,
            match_method: MatchMethod::Failed,
            search_variations,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.match_method == MatchMethod::Failed
    }

    /// Confident enough to use the token downstream.
    pub fn is_accepted(&self) -> bool {
        self.coin.is_some() && self.confidence >= ACCEPTANCE_THRESHOLD
    }

    pub fn coin_id(&self) -> Option<&str> {
        self.coin.as_ref().map(|c| c.id.as_str())
    }
}
