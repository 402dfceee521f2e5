//! CoinGecko wire formats and their conversion into crate models.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::models::{ChartPoint, CoinDetail, CoinSearchHit, MarketChart, OhlcPoint};

/// Response from /ping
#[derive(Debug, Deserialize)]
pub(super) struct PingResponse {
    pub gecko_says: String,
}

/// Response from /search
#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse {
    #[serde(default)]
    pub coins: Vec<CoinSearchHit>,
}

/// Response from /coins/{id}
#[derive(Debug, Deserialize)]
pub(super) struct CoinDetailResponse {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Option<String>>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CoinMarketData {
    #[serde(default)]
    pub market_cap: HashMap<String, Option<f64>>,
}

impl CoinDetailResponse {
    pub fn into_detail(self, vs_currency: &str) -> CoinDetail {
        let market_cap = self
            .market_data
            .and_then(|data| data.market_cap.get(vs_currency).copied().flatten());
        CoinDetail {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            categories: self.categories.into_iter().flatten().collect(),
            market_cap,
            market_cap_rank: self.market_cap_rank,
        }
    }
}

/// Response from /coins/{id}/market_chart/range
#[derive(Debug, Default, Deserialize)]
pub(super) struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub market_caps: Vec<(f64, Option<f64>)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, Option<f64>)>,
}

impl From<MarketChartResponse> for MarketChart {
    fn from(response: MarketChartResponse) -> Self {
        Self {
            prices: to_points(response.prices),
            market_caps: to_points(response.market_caps),
            total_volumes: to_points(response.total_volumes),
        }
    }
}

/// Response from /coins/{id}/circulating_supply_chart.
/// Supply values arrive as strings on some plans and numbers on others.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SupplyChartResponse {
    #[serde(default)]
    pub circulating_supply: Vec<(f64, serde_json::Value)>,
}

impl SupplyChartResponse {
    pub fn into_points(self) -> Vec<ChartPoint> {
        let raw = self
            .circulating_supply
            .into_iter()
            .map(|(ts, value)| {
                let parsed = match value {
                    serde_json::Value::Number(n) => n.as_f64(),
                    serde_json::Value::String(s) => s.parse::<f64>().ok(),
                    _ => None,
                };
                (ts, parsed)
            })
            .collect();
        to_points(raw)
    }
}

/// Response from /onchain/simple/networks/{network}/token_price/{address}
#[derive(Debug, Deserialize)]
pub(super) struct OnchainPriceResponse {
    pub data: OnchainPriceData,
}

#[derive(Debug, Deserialize)]
pub(super) struct OnchainPriceData {
    pub attributes: OnchainPriceAttributes,
}

#[derive(Debug, Deserialize)]
pub(super) struct OnchainPriceAttributes {
    #[serde(default)]
    pub token_prices: HashMap<String, Option<String>>,
}

impl OnchainPriceResponse {
    pub fn price_for(&self, address: &str) -> Option<f64> {
        self.data
            .attributes
            .token_prices
            .iter()
            .find(|(addr, _)| addr.eq_ignore_ascii_case(address))
            .and_then(|(_, price)| price.as_deref())
            .and_then(|price| price.parse::<f64>().ok())
    }
}

/// Convert `[timestamp_ms, o, h, l, c]` rows, skipping malformed timestamps.
pub(super) fn to_ohlc(rows: Vec<[f64; 5]>) -> Vec<OhlcPoint> {
    rows.into_iter()
        .filter_map(|[ts, open, high, low, close]| {
            let timestamp = millis_to_datetime(ts)?;
            Some(OhlcPoint {
                timestamp,
                open,
                high,
                low,
                close,
            })
        })
        .collect()
}

fn to_points(rows: Vec<(f64, Option<f64>)>) -> Vec<ChartPoint> {
    rows.into_iter()
        .filter_map(|(ts, value)| {
            let timestamp = millis_to_datetime(ts)?;
            value.map(|value| ChartPoint { timestamp, value })
        })
        .collect()
}

fn millis_to_datetime(ts: f64) -> Option<DateTime<Utc>> {
    let parsed = Utc.timestamp_millis_opt(ts as i64).single();
    if parsed.is_none() {
        warn!("Skipping chart row with invalid timestamp: {}", ts);
    }
    parsed
}
