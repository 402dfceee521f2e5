use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use protocap_market_data::{
    ApiPlan, CoinGeckoConfig, DefiLlamaConfig, Endpoints, RankingMetric, RevenueWindow,
};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_BATCH_DELAY_MS: u64 = 100;
const DEFAULT_LIMIT: usize = 50;
const DEFAULT_CACHE_PATH: &str = "./data/protocol-mappings.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown output format '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub coingecko_api_key: Option<String>,
    pub coingecko_plan: Option<ApiPlan>,
    pub coingecko_base_url: Option<String>,
    pub coingecko_pro_base_url: Option<String>,
    pub defillama_base_url: Option<String>,
    pub request_timeout: Duration,
    pub batch_delay: Duration,
    pub metric: RankingMetric,
    pub limit: usize,
    pub cache_path: PathBuf,
    pub output: OutputFormat,
}

impl Config {
    /// Read configuration from the process environment, after loading a
    /// `.env` file when one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let coingecko_plan = var("COINGECKO_PLAN")
            .map(|v| v.parse::<ApiPlan>())
            .transpose()
            .context("Invalid COINGECKO_PLAN")?;

        let window = var("PROTOCAP_WINDOW")
            .map(|v| v.parse::<RevenueWindow>())
            .transpose()
            .context("Invalid PROTOCAP_WINDOW")?
            .unwrap_or_default();
        let metric = match var("PROTOCAP_METRIC")
            .unwrap_or_else(|| "revenue".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "revenue" => RankingMetric::Revenue(window),
            "fees" => RankingMetric::Fees(window),
            "tvl" => RankingMetric::Tvl,
            other => return Err(anyhow!("Invalid PROTOCAP_METRIC: '{}'", other)),
        };

        let limit = parse_number(var("PROTOCAP_LIMIT"), "PROTOCAP_LIMIT", DEFAULT_LIMIT)?;
        if limit == 0 {
            return Err(anyhow!("Invalid PROTOCAP_LIMIT: must be at least 1"));
        }

        Ok(Self {
            coingecko_api_key: var("COINGECKO_API_KEY"),
            coingecko_plan,
            coingecko_base_url: var("COINGECKO_BASE_URL"),
            coingecko_pro_base_url: var("COINGECKO_PRO_BASE_URL"),
            defillama_base_url: var("DEFILLAMA_BASE_URL"),
            request_timeout: Duration::from_millis(parse_number(
                var("PROTOCAP_REQUEST_TIMEOUT_MS"),
                "PROTOCAP_REQUEST_TIMEOUT_MS",
                DEFAULT_TIMEOUT_MS,
            )?),
            batch_delay: Duration::from_millis(parse_number(
                var("PROTOCAP_BATCH_DELAY_MS"),
                "PROTOCAP_BATCH_DELAY_MS",
                DEFAULT_BATCH_DELAY_MS,
            )?),
            metric,
            limit,
            cache_path: var("PROTOCAP_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            output: var("PROTOCAP_OUTPUT")
                .map(|v| v.parse::<OutputFormat>())
                .transpose()
                .context("Invalid PROTOCAP_OUTPUT")?
                .unwrap_or(OutputFormat::Table),
        })
    }

    pub fn coingecko(&self) -> CoinGeckoConfig {
        let defaults = Endpoints::default();
        CoinGeckoConfig {
            api_key: self.coingecko_api_key.clone(),
            plan: self.coingecko_plan,
            timeout: self.request_timeout,
            endpoints: Endpoints {
                public_base_url: self
                    .coingecko_base_url
                    .clone()
                    .unwrap_or(defaults.public_base_url),
                pro_base_url: self
                    .coingecko_pro_base_url
                    .clone()
                    .unwrap_or(defaults.pro_base_url),
            },
            ..CoinGeckoConfig::default()
        }
    }

    pub fn defillama(&self) -> DefiLlamaConfig {
        let defaults = DefiLlamaConfig::default();
        DefiLlamaConfig {
            base_url: self
                .defillama_base_url
                .clone()
                .unwrap_or(defaults.base_url),
            timeout: self.request_timeout,
            rate_limit: defaults.rate_limit,
        }
    }
}

fn parse_number<T: FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    match value {
        Some(v) => v
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {}: '{}' is not a number", key, v)),
        None => Ok(default),
    }
}
