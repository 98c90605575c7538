use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloQuery {
    pub num_simulations: usize,
    pub horizon_days: usize,
    pub initial_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarQuery {
    pub confidence_level: f64,
    pub horizon_days: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivePricesQuery {
    /// Comma separated symbols
    pub symbols: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivePricesRefreshRequest {
    pub symbols: Vec<String>,
}

/// Live prices as returned by the API: either a bare map or wrapped with a timestamp
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum LivePricesResponse {
    Wrapped {
        prices: HashMap<String, f64>,
        #[serde(default)]
        as_of: Option<DateTime<Utc>>,
    },
    Bare(HashMap<String, f64>),
}

/// Prices for a set of symbols at one moment; freshness is the caller's concern
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub prices: HashMap<String, f64>,
    pub as_of: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn missing<'a>(&self, symbols: &'a [String]) -> Vec<&'a str> {
        symbols
            .iter()
            .filter(|s| !self.prices.contains_key(s.as_str()))
            .map(|s| s.as_str())
            .collect()
    }
}

impl From<LivePricesResponse> for PriceSnapshot {
    fn from(response: LivePricesResponse) -> Self {
        match response {
            LivePricesResponse::Wrapped { prices, as_of } => PriceSnapshot {
                prices,
                as_of: as_of.unwrap_or_else(Utc::now),
            },
            LivePricesResponse::Bare(prices) => PriceSnapshot {
                prices,
                as_of: Utc::now(),
            },
        }
    }
}
