//! Mapping cache: persistent protocol name -> token resolutions with lookup
//! statistics.

mod cache;
mod model;
mod store;

#[cfg(test)]
mod cache_tests;

pub use cache::{cache_key, MappingCache, MappingCacheConfig};
pub use model::{
    is_cacheable, BatchProgress, BatchResolution, MappingCacheEntry, MappingSnapshot,
    MappingStatistics, ProviderRef, ResolutionFailure, SnapshotStatistics,
};
pub use store::{read_snapshot, write_snapshot};
