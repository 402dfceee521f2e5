use std::collections::HashMap;

use async_trait::async_trait;

use protocap_market_data::{
    CoinGeckoClient, DefiLlamaClient, RankedProtocol, RankingMetric,
};

use crate::errors::Result;

/// Ranked protocols by revenue, fees or TVL.
#[async_trait]
pub trait RevenueSource: Send + Sync {
    async fn rankings(
        &self,
        metric: RankingMetric,
        limit: Option<usize>,
    ) -> Result<Vec<RankedProtocol>>;
}

/// Market caps for token ids. Ids without a cap are absent from the map.
#[async_trait]
pub trait MarketCapSource: Send + Sync {
    async fn market_caps(&self, ids: &[String]) -> Result<HashMap<String, f64>>;
}

#[async_trait]
impl RevenueSource for DefiLlamaClient {
    async fn rankings(
        &self,
        metric: RankingMetric,
        limit: Option<usize>,
    ) -> Result<Vec<RankedProtocol>> {
        Ok(DefiLlamaClient::rankings(self, metric, limit).await?)
    }
}

#[async_trait]
impl MarketCapSource for CoinGeckoClient {
    async fn market_caps(&self, ids: &[String]) -> Result<HashMap<String, f64>> {
        Ok(CoinGeckoClient::market_caps(self, ids).await)
    }
}
