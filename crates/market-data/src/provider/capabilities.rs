//! Plan capabilities and rate limiting configuration.
//!
//! Maps a market data subscription plan to the features it unlocks and the
//! limits it imposes. Everything here is constant data; no I/O.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Subscription plan of a market data credential.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiPlan {
    /// No credential; public endpoint.
    Free,
    /// Demo (registered free) key.
    Demo,
    /// Paid key (Analyst/Lite/Pro).
    Pro,
    /// Enterprise key.
    Enterprise,
}

impl ApiPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Demo => "demo",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for ApiPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiPlan {
    type Err = MarketDataError;

    /// Parse a plan name. Unknown names are rejected rather than mapped to
    /// some default tier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" | "public" => Ok(Self::Free),
            "demo" => Ok(Self::Demo),
            "pro" | "analyst" | "lite" => Ok(Self::Pro),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(MarketDataError::InvalidPlan(other.to_string())),
        }
    }
}

/// A plan-gated feature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlanFeature {
    Ohlc,
    SupplyCharts,
    CustomIntervals,
    Onchain,
    MarketIntelligence,
    UsageEndpoint,
}

impl PlanFeature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ohlc => "ohlc",
            Self::SupplyCharts => "supply-charts",
            Self::CustomIntervals => "custom-intervals",
            Self::Onchain => "onchain",
            Self::MarketIntelligence => "market-intelligence",
            Self::UsageEndpoint => "usage-endpoint",
        }
    }
}

/// Features and limits unlocked by a plan.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCapabilities {
    pub ohlc: bool,
    pub supply_charts: bool,
    pub custom_intervals: bool,
    pub onchain: bool,
    pub market_intelligence: bool,
    pub usage_endpoint: bool,
    /// Requests per minute.
    pub max_rate_limit: u32,
    /// Largest accepted `per_page`.
    pub max_per_page: u32,
}

impl ApiCapabilities {
    pub fn supports(&self, feature: PlanFeature) -> bool {
        match feature {
            PlanFeature::Ohlc => self.ohlc,
            PlanFeature::SupplyCharts => self.supply_charts,
            PlanFeature::CustomIntervals => self.custom_intervals,
            PlanFeature::Onchain => self.onchain,
            PlanFeature::MarketIntelligence => self.market_intelligence,
            PlanFeature::UsageEndpoint => self.usage_endpoint,
        }
    }

    /// Minimum spacing between two requests: `60_000 / max_rate_limit` ms.
    pub fn min_interval(&self) -> Duration {
        RateLimit::per_minute(self.max_rate_limit).min_delay
    }
}

/// Capabilities of a plan.
pub fn capabilities_for(plan: ApiPlan) -> ApiCapabilities {
    match plan {
        ApiPlan::Free => ApiCapabilities {
            ohlc: false,
            supply_charts: false,
            custom_intervals: false,
            onchain: false,
            market_intelligence: false,
            usage_endpoint: false,
            max_rate_limit: 10,
            max_per_page: 100,
        },
        ApiPlan::Demo => ApiCapabilities {
            ohlc: true,
            supply_charts: false,
            custom_intervals: false,
            onchain: false,
            market_intelligence: false,
            usage_endpoint: false,
            max_rate_limit: 30,
            max_per_page: 250,
        },
        ApiPlan::Pro => ApiCapabilities {
            ohlc: true,
            supply_charts: true,
            custom_intervals: true,
            onchain: true,
            market_intelligence: false,
            usage_endpoint: true,
            max_rate_limit: 500,
            max_per_page: 250,
        },
        ApiPlan::Enterprise => ApiCapabilities {
            ohlc: true,
            supply_charts: true,
            custom_intervals: true,
            onchain: true,
            market_intelligence: true,
            usage_endpoint: true,
            max_rate_limit: 1000,
            max_per_page: 250,
        },
    }
}

/// Rate limiting configuration for a provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Minimum delay between requests.
    pub min_delay: Duration,
}

impl RateLimit {
    /// Derive the spacing from a per-minute budget. Zero means unpaced.
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_delay = if requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(60_000 / u64::from(requests_per_minute))
        };
        Self {
            requests_per_minute,
            min_delay,
        }
    }

    /// No pacing at all.
    pub fn unlimited() -> Self {
        Self::per_minute(0)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(60)
    }
}
