use std::borrow::Cow;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Canonical token identifier of the market data provider (e.g. "bitcoin")
pub type CoinId = String;
