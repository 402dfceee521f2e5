//! Market data models: markets rows, charts and account usage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `/coins/markets` listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Sort order accepted by `/coins/markets`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MarketOrder {
    #[default]
    MarketCapDesc,
    MarketCapAsc,
    VolumeDesc,
}

impl MarketOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketCapDesc => "market_cap_desc",
            Self::MarketCapAsc => "market_cap_asc",
            Self::VolumeDesc => "volume_desc",
        }
    }
}

/// Parameters for a `/coins/markets` page.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketsQuery {
    /// Restrict to these ids; empty means the whole market.
    pub ids: Vec<String>,
    pub order: MarketOrder,
    /// 1-based page.
    pub page: u32,
    pub per_page: u32,
}

impl MarketsQuery {
    pub fn for_ids(ids: Vec<String>) -> Self {
        let per_page = ids.len().max(1) as u32;
        Self {
            ids,
            order: MarketOrder::default(),
            page: 1,
            per_page,
        }
    }

    pub fn top(per_page: u32) -> Self {
        Self {
            ids: Vec::new(),
            order: MarketOrder::default(),
            page: 1,
            per_page,
        }
    }
}

/// One OHLC candle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OhlcPoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Timestamped value of a chart series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Price, market cap and volume series for a range.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MarketChart {
    pub prices: Vec<ChartPoint>,
    pub market_caps: Vec<ChartPoint>,
    pub total_volumes: Vec<ChartPoint>,
}

/// Sampling interval for range charts. Anything but `Auto` is plan-gated.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ChartInterval {
    #[default]
    Auto,
    FiveMinutely,
    Hourly,
    Daily,
}

impl ChartInterval {
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::FiveMinutely => Some("5m"),
            Self::Hourly => Some("hourly"),
            Self::Daily => Some("daily"),
        }
    }
}

/// Biggest movers of the last 24h.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopMovers {
    #[serde(default)]
    pub top_gainers: Vec<CoinMover>,
    #[serde(default)]
    pub top_losers: Vec<CoinMover>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinMover {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub usd: Option<f64>,
    #[serde(default)]
    pub usd_24h_change: Option<f64>,
}

/// Account usage reported by the `/key` endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub plan: String,
    pub rate_limit_request_per_minute: u32,
    pub monthly_call_credit: u64,
    pub current_total_monthly_calls: u64,
    pub current_remaining_monthly_calls: u64,
}
