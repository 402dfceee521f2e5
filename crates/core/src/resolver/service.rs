use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{debug, warn};

use protocap_market_data::Coin;

use super::matcher::DirectoryIndex;
use super::model::ResolutionResult;
use super::names::{is_known_tokenless, name_variations, normalize};
use super::traits::{CoinDirectory, TokenResolver};
use crate::errors::{Error, Result};

/// Resolves protocol names against a token directory.
///
/// The lookup index is built once per directory snapshot and reused for as
/// long as the directory hands out the same `Arc`.
pub struct EntityResolver<D: CoinDirectory + ?Sized> {
    directory: Arc<D>,
    index: Mutex<Option<Arc<DirectoryIndex>>>,
}

impl<D: CoinDirectory + ?Sized> EntityResolver<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self {
            directory,
            index: Mutex::new(None),
        }
    }

    fn index_for(&self, coins: Arc<Vec<Coin>>) -> Arc<DirectoryIndex> {
        let mut cached = self.index.lock().unwrap_or_else(|poisoned| {
            warn!("Resolver index mutex was poisoned, recovering");
            poisoned.into_inner()
        });

        if let Some(index) = cached.as_ref() {
            if index.is_snapshot(&coins) {
                return index.clone();
            }
        }

        debug!("Building resolver index over {} coins", coins.len());
        let index = Arc::new(DirectoryIndex::build(coins));
        *cached = Some(index.clone());
        index
    }
}

#[async_trait]
impl<D: CoinDirectory + ?Sized> TokenResolver for EntityResolver<D> {
    async fn resolve(&self, name: &str) -> Result<ResolutionResult> {
        let raw = normalize(name);
        if raw.is_empty() {
            return Ok(ResolutionResult::failed(Vec::new()));
        }

        let variations = name_variations(name);

        if is_known_tokenless(name) {
            debug!("'{}' is a known tokenless protocol", name);
            return Ok(ResolutionResult::failed(variations));
        }

        let coins = self.directory.directory().await?;
        if coins.is_empty() {
            // Never a failed result: those are cached as tokenless.
            return Err(Error::EmptyDirectory);
        }
        let index = self.index_for(coins);

        let result = match index.find(&raw, &variations) {
            Some((coin, method)) => {
                debug!(
                    "Resolved '{}' to {} via {} ({:.2})",
                    name,
                    coin.id,
                    method,
                    method.confidence()
                );
                ResolutionResult::matched(coin, method, variations)
            }
            None => {
                debug!("No token for '{}' after {} variations", name, variations.len());
                ResolutionResult::failed(variations)
            }
        };
        Ok(result)
    }
}
