//! Protocap Market Data Crate
//!
//! HTTP clients for the two upstream providers of the protocol ranking
//! pipeline.
//!
//! # Overview
//!
//! - DefiLlama: ranked protocol revenue, fees and TVL
//! - CoinGecko: token directory and market data, sold in plan tiers
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |   ApiPlan        | --> |  ApiCapabilities |  (feature gates, limits)
//! +------------------+     +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  CoinGeckoClient |  (endpoint state machine)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  RequestQueue    |  (FIFO, paced, one per client)
//!                          +------------------+
//! ```
//!
//! # Error Handling
//!
//! Authoritative reads (`coins_list`, `coin`, `ohlc`, `rankings`, ...) return
//! [`MarketDataError`]. Best-effort reads (`search`, `coins_markets`,
//! `market_caps`, `simple_price`) log failures and return empty results.
//! Plan-gated operations fail with
//! [`MarketDataError::FeatureUnavailable`] before any request is sent.

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{ErrorKind, MarketDataError};

// Re-export all public types from models
pub use models::{
    ApiUsage, ChartInterval, ChartPoint, Coin, CoinDetail, CoinId, CoinMarket, CoinMover,
    CoinSearchHit, MarketChart, MarketOrder, MarketsQuery, OhlcPoint, ProviderId,
    RankedProtocol, RankingMetric, RevenueWindow, TopMovers,
};

// Re-export provider types
pub use provider::{
    capabilities_for, ApiCapabilities, ApiPlan, CoinGeckoClient, CoinGeckoConfig,
    DefiLlamaClient, DefiLlamaConfig, EndpointState, Endpoints, KeyTier, PlanFeature, RateLimit,
};

pub use registry::RequestQueue;
