use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

use super::types::ShareConversion;
use crate::error::{ConverterError, MissingPriceError};

/// Absorbs float representation error so 119.99999999999999 shares floor to 120
const SHARE_EPSILON: f64 = 1e-9;

fn usable_price(prices: &HashMap<String, f64>, symbol: &str) -> Option<f64> {
    prices.get(symbol).copied().filter(|p| p.is_finite() && *p > 0.0)
}

/// Whole shares per symbol: `floor(weight * portfolio_value / price)`.
///
/// A symbol without a usable price is reported in `missing` and skipped; the rest of the
/// batch is still converted. Negative weights convert to zero shares.
#[instrument(skip(weights, prices), fields(n_symbols = weights.len()))]
pub fn weights_to_shares(
    weights: &HashMap<String, f64>,
    portfolio_value: f64,
    prices: &HashMap<String, f64>,
) -> ShareConversion {
    let mut conversion = ShareConversion::default();

    for (symbol, &weight) in weights {
        let Some(price) = usable_price(prices, symbol) else {
            warn!(symbol = %symbol, price = ?prices.get(symbol), "No usable live price, skipping symbol");
            conversion.missing.push(MissingPriceError { symbol: symbol.clone() });
            continue;
        };
        let raw = weight * portfolio_value / price;
        let shares = if raw.is_finite() && raw > 0.0 {
            (raw + SHARE_EPSILON).floor() as u64
        } else {
            0
        };
        conversion.shares.insert(symbol.clone(), shares);
    }

    conversion.missing.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    debug!(
        converted = conversion.shares.len(),
        missing = conversion.missing.len(),
        "Weights converted to shares"
    );
    conversion
}

/// Market value weights of a share book: `shares * price / total value`.
///
/// Fails with `MissingPrices` if any held symbol (nonzero shares) lacks a usable price,
/// and with `EmptyPortfolio` when the total value is zero.
#[instrument(skip(shares, prices), fields(n_symbols = shares.len()))]
pub fn shares_to_weights(
    shares: &HashMap<String, u64>,
    prices: &HashMap<String, f64>,
) -> Result<BTreeMap<String, f64>, ConverterError> {
    let values = position_values(shares, prices)?;
    let total: f64 = values.values().sum();
    if total <= 0.0 {
        return Err(ConverterError::EmptyPortfolio);
    }
    Ok(values
        .into_iter()
        .map(|(symbol, value)| (symbol, value / total))
        .collect())
}

/// Total market value of a share book at the given prices
pub fn portfolio_value(
    shares: &HashMap<String, u64>,
    prices: &HashMap<String, f64>,
) -> Result<f64, ConverterError> {
    Ok(position_values(shares, prices)?.values().sum())
}

fn position_values(
    shares: &HashMap<String, u64>,
    prices: &HashMap<String, f64>,
) -> Result<BTreeMap<String, f64>, ConverterError> {
    let mut missing = Vec::new();
    let mut values = BTreeMap::new();

    for (symbol, &count) in shares {
        if count == 0 {
            values.insert(symbol.clone(), 0.0);
            continue;
        }
        match usable_price(prices, symbol) {
            Some(price) => {
                values.insert(symbol.clone(), count as f64 * price);
            }
            None => missing.push(symbol.clone()),
        }
    }

    if !missing.is_empty() {
        missing.sort();
        return Err(ConverterError::MissingPrices(missing));
    }
    Ok(values)
}
