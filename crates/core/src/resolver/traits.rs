use std::sync::Arc;

use async_trait::async_trait;

use protocap_market_data::{Coin, CoinGeckoClient};

use super::model::ResolutionResult;
use crate::errors::Result;

/// Source of the token directory.
#[async_trait]
pub trait CoinDirectory: Send + Sync {
    /// Current directory snapshot. The same `Arc` is returned until the
    /// source refreshes its data.
    async fn directory(&self) -> Result<Arc<Vec<Coin>>>;
}

/// Resolves a free-text protocol name to a token.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Always yields a result for a well-formed name; only directory failures
    /// are errors.
    async fn resolve(&self, name: &str) -> Result<ResolutionResult>;
}

#[async_trait]
impl CoinDirectory for CoinGeckoClient {
    async fn directory(&self) -> Result<Arc<Vec<Coin>>> {
        Ok(self.coin_directory().await?)
    }
}
