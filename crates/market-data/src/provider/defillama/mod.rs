//! DefiLlama protocol rankings client.
//!
//! Revenue and fees come from the fees overview, TVL from the protocols list.
//! No API key is needed; requests are still paced through a [`RequestQueue`].
//!
//! API documentation: https://defillama.com/docs/api

mod models;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::errors::MarketDataError;
use crate::models::{RankedProtocol, RankingMetric, RevenueWindow};
use crate::provider::RateLimit;
use crate::registry::RequestQueue;

use self::models::{FeesOverviewResponse, TvlProtocol};

pub const PROVIDER_ID: &str = "DEFILLAMA";

pub const DEFAULT_BASE_URL: &str = "https://api.llama.fi";

/// Default pacing; the public API asks for a few requests per second at most.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 120;

#[derive(Clone, Debug)]
pub struct DefiLlamaConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub rate_limit: RateLimit,
}

impl Default for DefiLlamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit: RateLimit::per_minute(DEFAULT_REQUESTS_PER_MINUTE),
        }
    }
}

/// Client for DefiLlama's public REST API.
pub struct DefiLlamaClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    queue: RequestQueue,
}

impl DefiLlamaClient {
    pub fn new(config: DefiLlamaConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .user_agent(concat!("protocap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            queue: RequestQueue::new(PROVIDER_ID, &config.rate_limit),
        })
    }

    /// Protocols ordered by `metric`, ranked from 1, truncated to `limit`.
    pub async fn rankings(
        &self,
        metric: RankingMetric,
        limit: Option<usize>,
    ) -> Result<Vec<RankedProtocol>, MarketDataError> {
        let rows = match metric {
            RankingMetric::Revenue(window) => self.fees_overview("dailyRevenue", window).await?,
            RankingMetric::Fees(window) => self.fees_overview("dailyFees", window).await?,
            RankingMetric::Tvl => self.tvl().await?,
        };

        let ranked = rank(rows, limit);
        info!("DefiLlama: {} protocols ranked by {}", ranked.len(), metric);
        Ok(ranked)
    }

    async fn fees_overview(
        &self,
        data_type: &str,
        window: RevenueWindow,
    ) -> Result<Vec<UnrankedRow>, MarketDataError> {
        let query = [
            ("excludeTotalDataChart", "true"),
            ("excludeTotalDataChartBreakdown", "true"),
            ("dataType", data_type),
        ];
        let response: FeesOverviewResponse = match self.fetch("/overview/fees", &query).await {
            Err(MarketDataError::NotFound { .. }) => FeesOverviewResponse::default(),
            other => other?,
        };

        Ok(response
            .protocols
            .into_iter()
            .map(|p| UnrankedRow {
                name: p.label().to_string(),
                value: p.total(window),
                slug: p.slug,
                category: p.category,
                chains: p.chains.unwrap_or_default(),
            })
            .collect())
    }

    async fn tvl(&self) -> Result<Vec<UnrankedRow>, MarketDataError> {
        let protocols: Vec<TvlProtocol> = match self.fetch("/protocols", &[]).await {
            Err(MarketDataError::NotFound { .. }) => Vec::new(),
            other => other?,
        };

        Ok(protocols
            .into_iter()
            .map(|p| UnrankedRow {
                name: p.name,
                value: p.tvl,
                slug: p.slug,
                category: p.category,
                chains: p.chains.unwrap_or_default(),
            })
            .collect())
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketDataError> {
        let url = format!("{}{}", self.base_url, path);

        let text = self
            .queue
            .run(|| async {
                debug!("DefiLlama request: {}", path);
                let request = self.http.get(&url).query(query).send();
                match tokio::time::timeout(self.timeout, request).await {
                    Ok(Ok(response)) => read_body(response, &url, path).await,
                    Ok(Err(e)) if e.is_timeout() => Err(timeout_error()),
                    Ok(Err(e)) => {
                        warn!("DefiLlama request to {} failed: {}", url, e);
                        Err(MarketDataError::Network(e))
                    }
                    Err(_) => {
                        warn!("DefiLlama request to {} timed out after {:?}", url, self.timeout);
                        Err(timeout_error())
                    }
                }
            })
            .await?;

        serde_json::from_str(&text).map_err(|e| MarketDataError::Parse {
            provider: PROVIDER_ID.to_string(),
            message: format!("{}: {}", path, e),
        })
    }
}

struct UnrankedRow {
    name: String,
    slug: Option<String>,
    category: Option<String>,
    chains: Vec<String>,
    value: Option<f64>,
}

/// Sort by value descending and assign 1-based ranks. Missing, negative and
/// non-finite values count as zero.
fn rank(rows: Vec<UnrankedRow>, limit: Option<usize>) -> Vec<RankedProtocol> {
    let mut rows: Vec<(UnrankedRow, f64)> = rows
        .into_iter()
        .filter(|row| !row.name.trim().is_empty())
        .map(|row| {
            let value = row.value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0);
            (row, value)
        })
        .collect();

    // Stable sort keeps provider order among equal values.
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    rows.into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, (row, value))| RankedProtocol {
            rank: index as u32 + 1,
            name: row.name.trim().to_string(),
            slug: row.slug,
            category: row.category,
            chains: row.chains,
            value,
        })
        .collect()
}

async fn read_body(
    response: reqwest::Response,
    url: &str,
    path: &str,
) -> Result<String, MarketDataError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(MarketDataError::NotFound {
            provider: PROVIDER_ID.to_string(),
            resource: path.to_string(),
        });
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("DefiLlama rate limited request to {}", url);
        return Err(MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("DefiLlama {} returned HTTP {}: {}", url, status, body);
        return Err(MarketDataError::Http {
            provider: PROVIDER_ID.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    response.text().await.map_err(MarketDataError::Network)
}

fn timeout_error() -> MarketDataError {
    MarketDataError::Timeout {
        provider: PROVIDER_ID.to_string(),
    }
}
