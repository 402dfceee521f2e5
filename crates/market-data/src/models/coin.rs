//! Token directory models.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Entry of the provider's token directory.
///
/// `id` is unique; `symbol` is not. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Canonical provider identifier (e.g. "pancakeswap-token")
    pub id: String,

    /// Ticker (e.g. "cake")
    pub symbol: String,

    /// Display name (e.g. "PancakeSwap")
    pub name: String,

    /// Chain -> contract address. Null or blank addresses are dropped.
    #[serde(default, deserialize_with = "deserialize_platforms")]
    pub platforms: BTreeMap<String, String>,
}

impl Coin {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            name: name.into(),
            platforms: BTreeMap::new(),
        }
    }

    /// Add a contract address.
    pub fn with_platform(mut self, chain: impl Into<String>, address: impl Into<String>) -> Self {
        self.platforms.insert(chain.into(), address.into());
        self
    }
}

fn deserialize_platforms<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(chain, address)| match address {
            Some(address) if !address.trim().is_empty() && !chain.is_empty() => {
                Some((chain, address))
            }
            _ => None,
        })
        .collect())
}

/// Single hit from the provider's free-text search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinSearchHit {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}

/// Subset of the single-coin detail payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Market cap in the client's quote currency, when reported.
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
}
