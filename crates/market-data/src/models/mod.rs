//! Market data models
//!
//! This module contains the core data types shared by the provider clients:
//! - `coin` - Token directory entries, search hits and coin details
//! - `market` - Markets rows, chart series and account usage
//! - `protocol` - Protocol rankings (revenue, fees, TVL)
//! - `types` - Type aliases for common identifiers

mod coin;
mod market;
mod protocol;
mod types;

pub use coin::{Coin, CoinDetail, CoinSearchHit};
pub use market::{
    ApiUsage, ChartInterval, ChartPoint, CoinMarket, CoinMover, MarketChart, MarketOrder,
    MarketsQuery, OhlcPoint, TopMovers,
};
pub use protocol::{RankedProtocol, RankingMetric, RevenueWindow};
pub use types::{CoinId, ProviderId};
