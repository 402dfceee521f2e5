//! Pipeline configuration, events and output rows.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use protocap_market_data::RankingMetric;

use crate::errors::Error;
use crate::mapping::{BatchProgress, MappingStatistics, ResolutionFailure};
use crate::resolver::MatchMethod;

#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub metric: RankingMetric,
    /// Keep only the top `limit` protocols.
    pub limit: Option<usize>,
}

/// Stage of a pipeline run. Runs move forward only; `Error` can follow any
/// stage and ends the run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelinePhase {
    LoadingRevenue,
    MappingProtocols,
    FetchingMarketCaps,
    Complete,
    Error,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LoadingRevenue => "loading revenue",
            Self::MappingProtocols => "mapping protocols",
            Self::FetchingMarketCaps => "fetching market caps",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Progress notification emitted during a run.
///
/// A run ends by entering `Complete` (followed by `Finished`) or, after a
/// `Failed` event, `Error`. Terminal phases have no `PhaseCompleted`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    PhaseStarted { phase: PipelinePhase },
    ProtocolMapped(BatchProgress),
    PhaseCompleted { phase: PipelinePhase },
    Failed { phase: PipelinePhase, message: String },
    Finished { rows: usize },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    Success,
    Partial,
    Failed,
}

/// Token attached to a protocol row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenRef {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// One protocol of the ranking, enriched with its token's market cap.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedProtocolRow {
    pub rank: u32,
    pub protocol_name: String,
    pub token: Option<TokenRef>,
    /// Ranking value (revenue, fees or TVL), never negative.
    pub revenue: f64,
    pub market_cap: Option<f64>,
    /// Share of the summed market caps present in this run.
    pub market_cap_percentage: Option<f64>,
    pub mapping_status: MappingStatus,
    pub confidence: f64,
    pub match_method: Option<MatchMethod>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub rows: Vec<CombinedProtocolRow>,
    pub failures: Vec<ResolutionFailure>,
    /// Mapping cache counters after the run.
    pub statistics: MappingStatistics,
}

/// A run that stopped in `phase`.
#[derive(Debug, Error)]
#[error("Pipeline failed while {phase}: {source}")]
pub struct PipelineError {
    pub phase: PipelinePhase,
    #[source]
    pub source: Error,
}
