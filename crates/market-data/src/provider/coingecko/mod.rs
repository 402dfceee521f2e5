//! CoinGecko market data client.
//!
//! This module talks to the CoinGecko v3 REST API:
//! - Token directory via /coins/list (cached for the client's lifetime)
//! - Market caps via /coins/markets, batched by the plan's page size
//! - Search, coin details, prices, charts and plan-gated extras
//!
//! All requests of one client run through a single [`RequestQueue`] paced by
//! the plan's rate limit. A key sent to the wrong root URL is detected from
//! the provider's 400 and corrected once (see [`EndpointState`]).
//!
//! API documentation: https://docs.coingecko.com/reference/introduction

mod endpoint;
mod models;


pub use endpoint::{
    Credential, Endpoint, EndpointState, Endpoints, KeyTier, DEMO_KEY_PARAM, PRO_BASE_URL,
    PRO_KEY_HEADER, PUBLIC_BASE_URL,
};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::errors::MarketDataError;
use crate::models::{
    ApiUsage, ChartInterval, ChartPoint, Coin, CoinDetail, CoinMarket, CoinSearchHit,
    MarketChart, MarketsQuery, OhlcPoint, TopMovers,
};
use crate::provider::{capabilities_for, ApiCapabilities, ApiPlan, PlanFeature, RateLimit};
use crate::registry::RequestQueue;

use self::models::{
    to_ohlc, CoinDetailResponse, MarketChartResponse, OnchainPriceResponse, PingResponse,
    SearchResponse, SupplyChartResponse,
};

pub const PROVIDER_ID: &str = "COINGECKO";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `days` values accepted by the OHLC endpoint.
const OHLC_DAYS: [u32; 7] = [1, 7, 14, 30, 90, 180, 365];

/// Client configuration, fixed at construction.
#[derive(Clone, Debug)]
pub struct CoinGeckoConfig {
    /// API key; `None` selects the public endpoint and the free plan.
    pub api_key: Option<String>,
    /// Explicit plan. When unset the plan follows the detected key tier.
    pub plan: Option<ApiPlan>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Root URLs to switch between.
    pub endpoints: Endpoints,
    /// Quote currency for market data (e.g. "usd").
    pub vs_currency: String,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            plan: None,
            timeout: DEFAULT_TIMEOUT,
            endpoints: Endpoints::default(),
            vs_currency: "usd".to_string(),
        }
    }
}

impl CoinGeckoConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

/// Rate-limited CoinGecko client.
pub struct CoinGeckoClient {
    http: Client,
    config: CoinGeckoConfig,
    state: Mutex<EndpointState>,
    queue: RequestQueue,
    directory: tokio::sync::Mutex<Option<Arc<Vec<Coin>>>>,
}

impl CoinGeckoClient {
    /// Create a client. A missing key is not an error: the client falls back to
    /// the public endpoint and logs a warning.
    pub fn new(config: CoinGeckoConfig) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .user_agent(concat!("protocap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MarketDataError::Client(e.to_string()))?;

        let state = EndpointState::for_key(config.api_key.as_deref());
        if state == EndpointState::Public {
            warn!("No CoinGecko API key configured, using the public endpoint (free plan)");
        }

        let plan = effective_plan(config.plan, state);
        let queue = RequestQueue::new(
            PROVIDER_ID,
            &RateLimit::per_minute(capabilities_for(plan).max_rate_limit),
        );

        info!(
            "CoinGecko client ready: endpoint state {:?}, plan {}",
            state, plan
        );

        Ok(Self {
            http,
            config,
            state: Mutex::new(state),
            queue,
            directory: tokio::sync::Mutex::new(None),
        })
    }

    /// Lock the endpoint state, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, EndpointState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("CoinGecko endpoint state mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current endpoint state.
    pub fn endpoint_state(&self) -> EndpointState {
        *self.lock_state()
    }

    /// Plan in effect: the configured plan, else the one implied by the tier.
    pub fn plan(&self) -> ApiPlan {
        effective_plan(self.config.plan, self.endpoint_state())
    }

    pub fn capabilities(&self) -> ApiCapabilities {
        capabilities_for(self.plan())
    }

    pub fn vs_currency(&self) -> &str {
        &self.config.vs_currency
    }

    fn require(&self, feature: PlanFeature) -> Result<(), MarketDataError> {
        let plan = self.plan();
        if capabilities_for(plan).supports(feature) {
            Ok(())
        } else {
            debug!("Rejecting {} call on {} plan", feature.as_str(), plan);
            Err(MarketDataError::FeatureUnavailable {
                feature: feature.as_str(),
                plan,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    fn current_endpoint(&self) -> (EndpointState, Endpoint) {
        let state = self.endpoint_state();
        let endpoint = self
            .config
            .endpoints
            .resolve(state, self.config.api_key.as_deref());
        (state, endpoint)
    }

    /// Apply the one allowed tier correction. Returns true when the request
    /// should be retried against the (now) corrected endpoint.
    fn correct_endpoint(&self, used: KeyTier) -> bool {
        let mut state = self.lock_state();
        if let Some(next) = state.correct(used) {
            *state = next;
            drop(state);
            let plan = self.plan();
            self.queue.set_rate_limit(&RateLimit::per_minute(
                capabilities_for(plan).max_rate_limit,
            ));
            warn!(
                "CoinGecko rejected the {:?} endpoint for this key, switched to {:?} (plan {})",
                used, next, plan
            );
            return true;
        }
        // Another request may already have switched away from `used`.
        matches!(*state, EndpointState::Corrected(tier) if tier != used)
    }

    /// GET a path and return the body, correcting the endpoint at most once.
    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<String, MarketDataError> {
        let (state, endpoint) = self.current_endpoint();
        match self.send(&endpoint, path, query).await {
            Err(err) if err.is_endpoint_mismatch() => {
                let Some(used) = state.tier() else {
                    return Err(err);
                };
                if !self.correct_endpoint(used) {
                    return Err(err);
                }
                let (_, corrected) = self.current_endpoint();
                debug!("Retrying {} against {}", path, corrected.base_url);
                self.send(&corrected, path, query).await
            }
            other => other,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketDataError> {
        let text = self.get_text(path, query).await?;
        serde_json::from_str(&text).map_err(|e| MarketDataError::Parse {
            provider: PROVIDER_ID.to_string(),
            message: format!("{}: {}", path, e),
        })
    }

    /// One queued HTTP attempt bounded by the configured timeout.
    async fn send(
        &self,
        endpoint: &Endpoint,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, MarketDataError> {
        let url = format!("{}{}", endpoint.base_url, path);
        let timeout = self.config.timeout;

        self.queue
            .run(|| async {
                let request = self
                    .http
                    .get(&url)
                    .header("Accept", "application/json")
                    .query(query);
                let request = endpoint.credential.apply(request);

                debug!("CoinGecko request: {} with {} params", path, query.len());

                match tokio::time::timeout(timeout, execute(request, &url, path)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!("CoinGecko request to {} timed out after {:?}", url, timeout);
                        Err(MarketDataError::Timeout {
                            provider: PROVIDER_ID.to_string(),
                        })
                    }
                }
            })
            .await
    }

    // ------------------------------------------------------------------------
    // Authoritative reads: errors propagate
    // ------------------------------------------------------------------------

    /// Check connectivity. Returns the provider's greeting.
    pub async fn ping(&self) -> Result<String, MarketDataError> {
        let response: PingResponse = self.get_json("/ping", &[]).await?;
        Ok(response.gecko_says)
    }

    /// Account usage and remaining quota.
    pub async fn key_usage(&self) -> Result<ApiUsage, MarketDataError> {
        self.require(PlanFeature::UsageEndpoint)?;
        self.get_json("/key", &[]).await
    }

    /// Full token directory, uncached.
    pub async fn coins_list(&self, include_platform: bool) -> Result<Vec<Coin>, MarketDataError> {
        let query = [("include_platform", include_platform.to_string())];
        empty_on_not_found(self.get_json("/coins/list", &query).await)
    }

    /// Token directory snapshot, fetched on first use and then shared.
    ///
    /// An empty directory is an error and is not kept, so the next call
    /// fetches again.
    pub async fn coin_directory(&self) -> Result<Arc<Vec<Coin>>, MarketDataError> {
        let mut directory = self.directory.lock().await;
        if let Some(coins) = directory.as_ref() {
            return Ok(coins.clone());
        }

        let coins = self.coins_list(true).await?;
        if coins.is_empty() {
            warn!("CoinGecko returned an empty coin directory");
            return Err(MarketDataError::NotFound {
                provider: PROVIDER_ID.to_string(),
                resource: "/coins/list".to_string(),
            });
        }
        let coins = Arc::new(coins);
        info!("Loaded CoinGecko directory with {} coins", coins.len());
        *directory = Some(coins.clone());
        Ok(coins)
    }

    /// Drop the directory snapshot; the next lookup refetches it.
    pub async fn invalidate_directory(&self) {
        *self.directory.lock().await = None;
    }

    /// Details of one coin. `None` when the id is unknown.
    pub async fn coin(&self, id: &str) -> Result<Option<CoinDetail>, MarketDataError> {
        let id = validate_id(id)?;
        let query = [
            ("localization", "false".to_string()),
            ("tickers", "false".to_string()),
            ("market_data", "true".to_string()),
            ("community_data", "false".to_string()),
            ("developer_data", "false".to_string()),
            ("sparkline", "false".to_string()),
        ];
        match self
            .get_json::<CoinDetailResponse>(&format!("/coins/{}", id), &query)
            .await
        {
            Ok(response) => Ok(Some(response.into_detail(&self.config.vs_currency))),
            Err(MarketDataError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Daily or intraday candles. `days` must be one of 1, 7, 14, 30, 90, 180, 365.
    pub async fn ohlc(&self, id: &str, days: u32) -> Result<Vec<OhlcPoint>, MarketDataError> {
        self.require(PlanFeature::Ohlc)?;
        let id = validate_id(id)?;
        if !OHLC_DAYS.contains(&days) {
            return Err(MarketDataError::InvalidRequest(format!(
                "ohlc days must be one of {:?}, got {}",
                OHLC_DAYS, days
            )));
        }
        let query = [
            ("vs_currency", self.config.vs_currency.clone()),
            ("days", days.to_string()),
        ];
        let rows: Vec<[f64; 5]> =
            empty_on_not_found(self.get_json(&format!("/coins/{}/ohlc", id), &query).await)?;
        Ok(to_ohlc(rows))
    }

    /// Price, market cap and volume between two instants.
    pub async fn market_chart_range(
        &self,
        id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        interval: ChartInterval,
    ) -> Result<MarketChart, MarketDataError> {
        if interval != ChartInterval::Auto {
            self.require(PlanFeature::CustomIntervals)?;
        }
        let id = validate_id(id)?;
        if from >= to {
            return Err(MarketDataError::InvalidRequest(format!(
                "range start {} is not before end {}",
                from, to
            )));
        }

        let mut query = vec![
            ("vs_currency", self.config.vs_currency.clone()),
            ("from", from.timestamp().to_string()),
            ("to", to.timestamp().to_string()),
        ];
        if let Some(param) = interval.as_param() {
            query.push(("interval", param.to_string()));
        }

        let response: MarketChartResponse = empty_on_not_found(
            self.get_json(&format!("/coins/{}/market_chart/range", id), &query)
                .await,
        )?;
        Ok(response.into())
    }

    /// Circulating supply history.
    pub async fn circulating_supply_chart(
        &self,
        id: &str,
        days: u32,
    ) -> Result<Vec<ChartPoint>, MarketDataError> {
        self.require(PlanFeature::SupplyCharts)?;
        let id = validate_id(id)?;
        if days == 0 {
            return Err(MarketDataError::InvalidRequest(
                "supply chart needs at least one day".to_string(),
            ));
        }
        let query = [("days", days.to_string())];
        let response: SupplyChartResponse = empty_on_not_found(
            self.get_json(&format!("/coins/{}/circulating_supply_chart", id), &query)
                .await,
        )?;
        Ok(response.into_points())
    }

    /// Largest 24h gainers and losers.
    pub async fn top_gainers_losers(&self) -> Result<TopMovers, MarketDataError> {
        self.require(PlanFeature::MarketIntelligence)?;
        let query = [("vs_currency", self.config.vs_currency.clone())];
        empty_on_not_found(self.get_json("/coins/top_gainers_losers", &query).await)
    }

    /// On-chain USD price of a token contract. `None` when the pool data has no price.
    pub async fn onchain_token_price(
        &self,
        network: &str,
        address: &str,
    ) -> Result<Option<f64>, MarketDataError> {
        self.require(PlanFeature::Onchain)?;
        let network = validate_id(network)?;
        let address = validate_id(address)?;
        let path = format!(
            "/onchain/simple/networks/{}/token_price/{}",
            network, address
        );
        match self.get_json::<OnchainPriceResponse>(&path, &[]).await {
            Ok(response) => Ok(response.price_for(address)),
            Err(MarketDataError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------------
    // Best-effort reads: failures degrade to empty results
    // ------------------------------------------------------------------------

    /// Free-text coin search.
    pub async fn search(&self, query: &str) -> Vec<CoinSearchHit> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let params = [("query", query.to_string())];
        let result = self
            .get_json::<SearchResponse>("/search", &params)
            .await
            .map(|r| r.coins);
        or_empty(result, "search")
    }

    /// One page of the markets listing.
    pub async fn coins_markets(&self, query: &MarketsQuery) -> Vec<CoinMarket> {
        or_empty(self.fetch_markets(query).await, "coins/markets")
    }

    /// Market caps for the given ids, batched by the plan's page size.
    /// Ids without a reported cap are absent from the map.
    pub async fn market_caps(&self, ids: &[String]) -> HashMap<String, f64> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let page_size = self.capabilities().max_per_page.max(1) as usize;
        let mut caps = HashMap::with_capacity(unique.len());

        for chunk in unique.chunks(page_size) {
            let query = MarketsQuery::for_ids(chunk.to_vec());
            match self.fetch_markets(&query).await {
                Ok(rows) => {
                    for row in rows {
                        if let Some(cap) = row.market_cap {
                            caps.insert(row.id, cap);
                        }
                    }
                }
                Err(MarketDataError::NotFound { .. }) => {}
                Err(e) => warn!(
                    "CoinGecko market caps for {} ids failed, continuing: {}",
                    chunk.len(),
                    e
                ),
            }
        }

        debug!(
            "CoinGecko: market caps for {}/{} ids",
            caps.len(),
            unique.len()
        );
        caps
    }

    /// Spot prices in the quote currency.
    pub async fn simple_price(&self, ids: &[String]) -> HashMap<String, f64> {
        if ids.is_empty() {
            return HashMap::new();
        }
        let query = [
            ("ids", ids.join(",")),
            ("vs_currencies", self.config.vs_currency.clone()),
        ];
        let result = self
            .get_json::<HashMap<String, HashMap<String, Option<f64>>>>("/simple/price", &query)
            .await
            .map(|prices| {
                prices
                    .into_iter()
                    .filter_map(|(id, quotes)| {
                        quotes
                            .get(&self.config.vs_currency)
                            .copied()
                            .flatten()
                            .map(|price| (id, price))
                    })
                    .collect()
            });
        or_empty(result, "simple/price")
    }

    async fn fetch_markets(&self, query: &MarketsQuery) -> Result<Vec<CoinMarket>, MarketDataError> {
        let max_per_page = self.capabilities().max_per_page;
        if query.page == 0 {
            return Err(MarketDataError::InvalidRequest(
                "page numbers start at 1".to_string(),
            ));
        }
        if query.per_page == 0 || query.per_page > max_per_page {
            return Err(MarketDataError::InvalidRequest(format!(
                "per_page must be between 1 and {} on the {} plan, got {}",
                max_per_page,
                self.plan(),
                query.per_page
            )));
        }

        let mut params = vec![
            ("vs_currency", self.config.vs_currency.clone()),
            ("order", query.order.as_str().to_string()),
            ("per_page", query.per_page.to_string()),
            ("page", query.page.to_string()),
            ("sparkline", "false".to_string()),
        ];
        if !query.ids.is_empty() {
            params.push(("ids", query.ids.join(",")));
        }

        empty_on_not_found(self.get_json("/coins/markets", &params).await)
    }
}

/// Send a prepared request and map the response status.
async fn execute(
    request: reqwest::RequestBuilder,
    url: &str,
    path: &str,
) -> Result<String, MarketDataError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: PROVIDER_ID.to_string(),
            }
        } else {
            warn!("CoinGecko request to {} failed: {}", url, e);
            MarketDataError::Network(e)
        }
    })?;

    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        debug!("CoinGecko: {} not found", path);
        return Err(MarketDataError::NotFound {
            provider: PROVIDER_ID.to_string(),
            resource: path.to_string(),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!("CoinGecko rate limited request to {}", url);
        return Err(MarketDataError::RateLimited {
            provider: PROVIDER_ID.to_string(),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!("CoinGecko {} returned HTTP {}: {}", url, status, body);
        return Err(MarketDataError::Http {
            provider: PROVIDER_ID.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response.text().await.map_err(MarketDataError::Network)
}

fn effective_plan(configured: Option<ApiPlan>, state: EndpointState) -> ApiPlan {
    configured.unwrap_or_else(|| state.tier().map(KeyTier::plan).unwrap_or(ApiPlan::Free))
}

fn validate_id(id: &str) -> Result<&str, MarketDataError> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') || id.contains('?') {
        return Err(MarketDataError::InvalidRequest(format!(
            "invalid identifier '{}'",
            id
        )));
    }
    Ok(id)
}

fn empty_on_not_found<T: Default>(result: Result<T, MarketDataError>) -> Result<T, MarketDataError> {
    match result {
        Err(MarketDataError::NotFound { .. }) => Ok(T::default()),
        other => other,
    }
}

fn or_empty<T: Default>(result: Result<T, MarketDataError>, operation: &str) -> T {
    match result {
        Ok(value) => value,
        Err(MarketDataError::NotFound { .. }) => T::default(),
        Err(e) => {
            warn!("CoinGecko {} failed, returning empty result: {}", operation, e);
            T::default()
        }
    }
}
