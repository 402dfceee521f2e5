//! Protocol ranking models (revenue / fees / TVL).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Aggregation window for revenue and fee totals.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevenueWindow {
    #[serde(rename = "24h")]
    #[default]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "1y")]
    Year,
}

impl RevenueWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Year => "1y",
        }
    }
}

impl FromStr for RevenueWindow {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" | "1d" | "day" => Ok(Self::Day),
            "7d" | "week" => Ok(Self::Week),
            "30d" | "month" => Ok(Self::Month),
            "1y" | "365d" | "year" => Ok(Self::Year),
            other => Err(MarketDataError::InvalidRequest(format!(
                "unknown revenue window '{}'",
                other
            ))),
        }
    }
}

/// Which number the protocol ranking is ordered by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RankingMetric {
    Revenue(RevenueWindow),
    Fees(RevenueWindow),
    Tvl,
}

impl Default for RankingMetric {
    fn default() -> Self {
        Self::Revenue(RevenueWindow::default())
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revenue(window) => write!(f, "revenue ({})", window.as_str()),
            Self::Fees(window) => write!(f, "fees ({})", window.as_str()),
            Self::Tvl => f.write_str("tvl"),
        }
    }
}

/// Ranked protocol row from the ranking provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedProtocol {
    /// 1-based position by descending `value`.
    pub rank: u32,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    /// Revenue, fees or TVL in USD; never negative.
    pub value: f64,
}
