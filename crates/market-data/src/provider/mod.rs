//! Market data provider clients.
//!
//! This module contains:
//! - Plan capabilities and rate limiting configuration
//! - The CoinGecko client (token directory, market caps, plan-gated extras)
//! - The DefiLlama client (protocol revenue / fees / TVL rankings)
//!
//! Each client owns one [`RequestQueue`](crate::registry::RequestQueue), so
//! requests to a provider never overlap and are paced by its rate limit.

mod capabilities;

pub mod coingecko;
pub mod defillama;

pub use capabilities::{capabilities_for, ApiCapabilities, ApiPlan, PlanFeature, RateLimit};
pub use coingecko::{CoinGeckoClient, CoinGeckoConfig, EndpointState, Endpoints, KeyTier};
pub use defillama::{DefiLlamaClient, DefiLlamaConfig};
