use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use eyre::{Result, eyre};
use url::Url;

use crate::advisor::types::AdvisorThresholds;
use crate::strategy::strategy_constants::DEFAULT_BATCH_TIMEOUT_SECS;

#[derive(Debug, Clone)]
pub struct Config {
    pub analytics_api_url: Url,
    pub http_timeout: Duration,
    pub rate_limit_per_sec: u32,
    pub strategy_batch_timeout: Duration,
    pub advisor_thresholds: AdvisorThresholds,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let analytics_api_url = env::var("ANALYTICS_API_URL")
            .map_err(|_| eyre!("Missing ANALYTICS_API_URL"))?;
        let analytics_api_url = Url::parse(&analytics_api_url)
            .map_err(|e| eyre!("Invalid ANALYTICS_API_URL {}: {}", analytics_api_url, e))?;

        let http_timeout = Duration::from_secs(env_or("HTTP_TIMEOUT_SECS", 10u64)?);
        let rate_limit_per_sec = env_or("ANALYTICS_RATE_LIMIT_PER_SEC", 5u32)?;
        if rate_limit_per_sec == 0 {
            return Err(eyre!("ANALYTICS_RATE_LIMIT_PER_SEC must be at least 1"));
        }
        let strategy_batch_timeout = Duration::from_secs(env_or("STRATEGY_BATCH_TIMEOUT_SECS", DEFAULT_BATCH_TIMEOUT_SECS)?);

        let defaults = AdvisorThresholds::default();
        let advisor_thresholds = AdvisorThresholds {
            min_sharpe_improvement_pct: env_or(
                "ADVISOR_MIN_SHARPE_IMPROVEMENT_PCT",
                defaults.min_sharpe_improvement_pct,
            )?,
            max_volatility_ratio: env_or("ADVISOR_MAX_VOLATILITY_RATIO", defaults.max_volatility_ratio)?,
            min_return_ratio: env_or("ADVISOR_MIN_RETURN_RATIO", defaults.min_return_ratio)?,
        };

        Ok(Config {
            analytics_api_url,
            http_timeout,
            rate_limit_per_sec,
            strategy_batch_timeout,
            advisor_thresholds,
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| eyre!("Invalid {} value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
