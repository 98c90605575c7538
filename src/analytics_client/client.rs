use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use governor::{Quota, DefaultDirectRateLimiter};
use nonzero_ext::*;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;
use eyre::{Result, eyre};

use super::types::{
    LivePricesQuery, LivePricesRefreshRequest, LivePricesResponse, MonteCarloQuery, PriceSnapshot, VarQuery,
};
use crate::config::Config;
use crate::simulation::types::{SimulationResult, VarResult};
use crate::strategy::aggregator::StrategyEvaluator;
use crate::strategy::types::{StrategyMethod, StrategyResult};

struct AnalyticsRateLimiter {
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl reqwest_ratelimit::RateLimiter for AnalyticsRateLimiter {
    async fn acquire_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

/// Client for the analytics service that computes strategies, simulations, VaR and live prices.
/// Requests are rate limited and never retried.
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    http_client: ClientWithMiddleware,
    base_url: Url,
}

impl AnalyticsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let reqwest_client = reqwest_middleware::reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let per_second = NonZeroU32::new(config.rate_limit_per_sec).unwrap_or(nonzero!(1u32));
        let rate_limiter = AnalyticsRateLimiter {
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(per_second))),
        };

        let http_client = ClientBuilder::new(reqwest_client)
            .with(reqwest_ratelimit::all(rate_limiter))
            .build();

        Ok(Self {
            http_client,
            base_url: config.analytics_api_url.clone(),
        })
    }

    /// Backtest one strategy for a portfolio
    #[instrument(skip(self))]
    pub async fn evaluate_strategy(&self, portfolio_id: &str, method: StrategyMethod) -> Result<StrategyResult> {
        let url = endpoint(&self.base_url, &["portfolios", portfolio_id, "strategies", method.as_str()])?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    pub async fn monte_carlo(
        &self,
        portfolio_id: &str,
        num_simulations: usize,
        horizon_days: usize,
        initial_value: f64,
    ) -> Result<SimulationResult> {
        let mut url = endpoint(&self.base_url, &["portfolios", portfolio_id, "monte-carlo"])?;
        set_query(&mut url, &MonteCarloQuery { num_simulations, horizon_days, initial_value })?;
        self.get_json(url).await
    }

    #[instrument(skip(self))]
    pub async fn value_at_risk(&self, portfolio_id: &str, confidence_level: f64, horizon_days: usize) -> Result<VarResult> {
        let mut url = endpoint(&self.base_url, &["portfolios", portfolio_id, "var"])?;
        set_query(&mut url, &VarQuery { confidence_level, horizon_days })?;
        self.get_json(url).await
    }

    /// Latest known prices for `symbols`
    #[instrument(skip(self))]
    pub async fn live_prices(&self, symbols: &[String]) -> Result<PriceSnapshot> {
        let mut url = endpoint(&self.base_url, &["prices", "live"])?;
        set_query(&mut url, &LivePricesQuery { symbols: symbols.join(",") })?;
        let response: LivePricesResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    /// Ask the service to refresh prices for `symbols` and return the refreshed snapshot
    #[instrument(skip(self))]
    pub async fn refresh_live_prices(&self, symbols: &[String]) -> Result<PriceSnapshot> {
        let url = endpoint(&self.base_url, &["prices", "live"])?;
        let body = LivePricesRefreshRequest { symbols: symbols.to_vec() };
        debug!(url = %url, "Sending price refresh request to analytics API");
        let response = self.http_client.put(url).json(&body).send().await?.error_for_status()?;
        let response: LivePricesResponse = response.json().await?;
        Ok(response.into())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "Sending request to analytics API");
        let response = self.http_client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

impl StrategyEvaluator for AnalyticsClient {
    async fn evaluate(&self, portfolio_id: &str, method: StrategyMethod) -> Result<StrategyResult> {
        self.evaluate_strategy(portfolio_id, method).await
    }
}

/// Append percent-encoded path segments to the base URL
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| eyre!("Analytics API URL cannot be a base: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn set_query<Q: Serialize>(url: &mut Url, query: &Q) -> Result<()> {
    let query_string = serde_url_params::to_string(query)?;
    url.set_query(Some(&query_string));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_encoded_segments() {
        let base = Url::parse("https://analytics.example.com/api/").unwrap();
        let url = endpoint(&base, &["portfolios", "growth fund/1", "strategies", "mean_variance"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://analytics.example.com/api/portfolios/growth%20fund%2F1/strategies/mean_variance"
        );

        let bare = Url::parse("https://analytics.example.com").unwrap();
        let url = endpoint(&bare, &["prices", "live"]).unwrap();
        assert_eq!(url.as_str(), "https://analytics.example.com/prices/live");
    }

    #[test]
    fn query_is_attached() {
        let mut url = Url::parse("https://analytics.example.com/portfolios/7/var").unwrap();
        set_query(&mut url, &VarQuery { confidence_level: 0.95, horizon_days: 10 }).unwrap();
        assert_eq!(url.query(), Some("confidence_level=0.95&horizon_days=10"));
    }
}
