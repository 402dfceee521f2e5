/// Minimum confidence for a resolution to be accepted, cached and sent to the
/// market cap fetch
pub const ACCEPTANCE_THRESHOLD: f64 = 0.40;

/// Minimum confidence for a mapping with a market cap to count as a success
pub const SUCCESS_THRESHOLD: f64 = 0.80;

/// Version written into mapping snapshots
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Default pause between resolver calls in a batch, in milliseconds
pub const DEFAULT_BATCH_DELAY_MS: u64 = 100;
