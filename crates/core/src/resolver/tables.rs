//! Fixed lookup tables used by name cleaning and matching.

/// Alias key (matched by containment in the raw or cleaned name) and the
/// candidates it contributes, in order.
pub const ALIASES: &[(&str, &[&str])] = &[
    ("pancakeswap", &["pancakeswap", "cake"]),
    ("uniswap", &["uniswap", "uni"]),
    ("sushiswap", &["sushi"]),
    ("curve", &["curve-dao-token", "crv"]),
    ("lido", &["lido-dao", "ldo"]),
    ("makerdao", &["maker", "mkr"]),
    ("compound", &["compound-governance-token", "comp"]),
    ("jupiter", &["jupiter-exchange-solana", "jup"]),
    ("raydium", &["raydium", "ray"]),
    ("hyperliquid", &["hyperliquid", "hype"]),
    ("ethena", &["ethena", "ena"]),
    ("aerodrome", &["aerodrome-finance", "aero"]),
    ("dydx", &["dydx-chain", "dydx"]),
    ("gmx", &["gmx"]),
    ("pendle", &["pendle"]),
    ("morpho", &["morpho"]),
    ("eigenlayer", &["eigenlayer", "eigen"]),
    ("rocket pool", &["rocket-pool", "rpl"]),
    ("balancer", &["balancer", "bal"]),
    ("1inch", &["1inch"]),
    ("thorchain", &["thorchain", "rune"]),
    ("pump.fun", &["pump-fun", "pump"]),
];

/// Protocols known to have no token of their own, matched exactly against
/// the raw or cleaned name.
pub const TOKENLESS_NAMES: &[&str] = &[
    "tether",
    "circle",
    "phantom",
    "metamask",
    "metamask swap",
    "coinbase wallet",
    "binance wallet",
    "axiom",
    "photon",
    "bullx",
    "gmgn",
    "base",
    "opensea",
    "flashbots",
    "trust wallet",
];

/// Substrings that mark a name as tokenless wherever they appear.
pub const TOKENLESS_PATTERNS: &[&str] = &[
    " wallet",
    "trading bot",
    "telegram bot",
    "sniper bot",
    "mev bot",
];

/// Trailing words removed by name cleaning.
pub const DESCRIPTORS: &[&str] = &[
    "amm",
    "dex",
    "exchange",
    "protocol",
    "finance",
    "perps",
    "perpetuals",
    "lending",
    "markets",
    "labs",
    "dao",
    "network",
];

/// Words never picked as the first significant word.
pub const STOP_WORDS: &[&str] = &["the", "and", "for", "of", "on", "by", "with", "app"];
