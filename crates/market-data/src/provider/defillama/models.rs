//! DefiLlama wire formats.

use serde::Deserialize;

use crate::models::RevenueWindow;

/// Response from /overview/fees
#[derive(Debug, Default, Deserialize)]
pub(super) struct FeesOverviewResponse {
    #[serde(default)]
    pub protocols: Vec<FeesProtocol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FeesProtocol {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Option<Vec<String>>,
    #[serde(default)]
    pub total24h: Option<f64>,
    #[serde(default)]
    pub total7d: Option<f64>,
    #[serde(default)]
    pub total30d: Option<f64>,
    #[serde(default)]
    pub total1y: Option<f64>,
}

impl FeesProtocol {
    pub fn total(&self, window: RevenueWindow) -> Option<f64> {
        match window {
            RevenueWindow::Day => self.total24h,
            RevenueWindow::Week => self.total7d,
            RevenueWindow::Month => self.total30d,
            RevenueWindow::Year => self.total1y,
        }
    }

    /// The overview lists some protocols under an internal name and a
    /// human-facing display name; rankings use the latter.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// Entry of /protocols
#[derive(Debug, Deserialize)]
pub(super) struct TvlProtocol {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Option<Vec<String>>,
    #[serde(default)]
    pub tvl: Option<f64>,
}
