//! Credential tier detection and endpoint selection.
//!
//! CoinGecko serves demo and paid keys from different root URLs and expects
//! the key in a different place for each. The tier is guessed from the key's
//! shape, and the guess can be corrected once at runtime when the provider
//! reports that the key was sent to the wrong root URL.

use reqwest::RequestBuilder;

use crate::provider::ApiPlan;

/// Root URL for public and demo-key traffic.
pub const PUBLIC_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Root URL for paid-key traffic.
pub const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

/// Query parameter carrying a demo key.
pub const DEMO_KEY_PARAM: &str = "x_cg_demo_api_key";

/// Header carrying a paid key.
pub const PRO_KEY_HEADER: &str = "x-cg-pro-api-key";

const DEMO_KEY_PREFIX: &str = "CG-";
const DEMO_KEY_MAX_LEN: usize = 30;

/// Tier of an API key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyTier {
    Demo,
    Pro,
}

impl KeyTier {
    /// Best-effort guess from the key's shape: short `CG-` keys are demo keys,
    /// everything else is treated as a paid key.
    pub fn detect(key: &str) -> Self {
        let key = key.trim();
        if key.starts_with(DEMO_KEY_PREFIX) && key.len() <= DEMO_KEY_MAX_LEN {
            Self::Demo
        } else {
            Self::Pro
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Demo => Self::Pro,
            Self::Pro => Self::Demo,
        }
    }

    /// Plan implied by the tier when no explicit plan is configured.
    pub fn plan(self) -> ApiPlan {
        match self {
            Self::Demo => ApiPlan::Demo,
            Self::Pro => ApiPlan::Pro,
        }
    }
}

/// Where the client currently sends requests.
///
/// `Uncertain` may move to `Corrected` exactly once; `Public` and `Corrected`
/// are final.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointState {
    /// No key configured.
    Public,
    /// Tier guessed from the key, not yet confirmed.
    Uncertain(KeyTier),
    /// Tier switched after the provider rejected the guess.
    Corrected(KeyTier),
}

impl EndpointState {
    pub fn for_key(api_key: Option<&str>) -> Self {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::Uncertain(KeyTier::detect(key)),
            None => Self::Public,
        }
    }

    pub fn tier(&self) -> Option<KeyTier> {
        match self {
            Self::Public => None,
            Self::Uncertain(tier) | Self::Corrected(tier) => Some(*tier),
        }
    }

    /// State after the provider rejected a request sent with `used` tier.
    ///
    /// Returns `None` when no transition is allowed: the state is final, or the
    /// rejection refers to a tier that is no longer in use.
    pub fn correct(&self, used: KeyTier) -> Option<Self> {
        match self {
            Self::Uncertain(tier) if *tier == used => Some(Self::Corrected(tier.other())),
            _ => None,
        }
    }
}

/// How the key travels with a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Credential {
    None,
    QueryParam(&'static str, String),
    Header(&'static str, String),
}

impl Credential {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => request,
            Self::QueryParam(name, value) => request.query(&[(*name, value.as_str())]),
            Self::Header(name, value) => request.header(*name, value.as_str()),
        }
    }
}

/// Concrete target of a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub base_url: String,
    pub credential: Credential,
}

/// The two root URLs a client can switch between.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub public_base_url: String,
    pub pro_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            public_base_url: PUBLIC_BASE_URL.to_string(),
            pro_base_url: PRO_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    pub fn resolve(&self, state: EndpointState, api_key: Option<&str>) -> Endpoint {
        let key = api_key.map(|k| k.trim().to_string());
        match (state.tier(), key) {
            (Some(KeyTier::Demo), Some(key)) => Endpoint {
                base_url: trim_base(&self.public_base_url),
                credential: Credential::QueryParam(DEMO_KEY_PARAM, key),
            },
            (Some(KeyTier::Pro), Some(key)) => Endpoint {
                base_url: trim_base(&self.pro_base_url),
                credential: Credential::Header(PRO_KEY_HEADER, key),
            },
            _ => Endpoint {
                base_url: trim_base(&self.public_base_url),
                credential: Credential::None,
            },
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
