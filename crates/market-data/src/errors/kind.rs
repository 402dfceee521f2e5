/// Coarse error classification.
///
/// Lets callers tell transport failures apart without matching every
/// [`MarketDataError`](super::MarketDataError) variant.
///
/// | Kind | Typical handling |
/// |------|------------------|
/// | `Timeout` | Best-effort reads degrade to empty, authoritative reads propagate |
/// | `Network` | Same as `Timeout` |
/// | `Http` | Logged with URL/status/body, then propagated |
/// | `FeatureUnavailable` | Caller picks another operation; no request was sent |
/// | `NotFound` | Converted to an empty result by collection endpoints |
/// | `Decode` | Propagated; the provider changed its payload |
/// | `Configuration` | Propagated; fix the inputs |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The request exceeded the client timeout.
    Timeout,

    /// Connection or transport failure.
    Network,

    /// Non-success HTTP status (including 429).
    Http,

    /// Plan does not include the requested feature.
    FeatureUnavailable,

    /// HTTP 404.
    NotFound,

    /// Response body could not be decoded.
    Decode,

    /// Invalid parameters, plan names or client setup.
    Configuration,
}
