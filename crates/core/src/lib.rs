//! Protocap Core - protocol-to-token resolution and revenue aggregation.
//!
//! This crate contains the business logic on top of the provider clients:
//! - [`resolver`]: confidence-scored matching of protocol names to tokens
//! - [`mapping`]: persistent mapping cache with lookup statistics
//! - [`pipeline`]: revenue ranking joined with token market caps
//!
//! Providers are reached through small traits ([`CoinDirectory`],
//! [`RevenueSource`], [`MarketCapSource`]) so every service can be tested
//! with in-memory fakes.

pub mod constants;
pub mod errors;
pub mod mapping;
pub mod pipeline;
pub mod resolver;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

pub use mapping::{
    BatchProgress, BatchResolution, MappingCache, MappingCacheConfig, MappingCacheEntry,
    MappingSnapshot, MappingStatistics, ProviderRef, ResolutionFailure,
};
pub use pipeline::{
    AggregationPipeline, CombinedProtocolRow, MappingStatus, MarketCapSource, PipelineConfig,
    PipelineError, PipelineEvent, PipelinePhase, PipelineReport, RevenueSource, TokenRef,
};
pub use resolver::{
    clean_name, name_variations, CoinDirectory, EntityResolver, MatchMethod, ResolutionResult,
    TokenResolver,
};
