//! Aggregation pipeline: revenue ranking -> token mapping -> market caps.

mod model;
mod service;
mod sources;


pub use model::{
    CombinedProtocolRow, MappingStatus, PipelineConfig, PipelineError, PipelineEvent,
    PipelinePhase, PipelineReport, TokenRef,
};
pub use service::AggregationPipeline;
pub use sources::{MarketCapSource, RevenueSource};
