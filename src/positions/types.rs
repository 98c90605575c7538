use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};

use crate::error::{IncompletePositionError, MissingPriceError, WeightValidationError};

/// Weights across a fully specified portfolio must sum to 1 within this tolerance
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// A holding expressed as a fractional weight, a whole-share count, or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    symbol: String,
    weight: Option<f64>,
    shares: Option<u64>,
}

#[derive(Deserialize)]
struct RawPosition {
    symbol: String,
    weight: Option<f64>,
    shares: Option<u64>,
}

impl TryFrom<RawPosition> for Position {
    type Error = IncompletePositionError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.symbol, raw.weight, raw.shares)
    }
}

impl Position {
    pub fn new(symbol: impl Into<String>, weight: Option<f64>, shares: Option<u64>) -> Result<Self, IncompletePositionError> {
        let symbol = symbol.into();
        if weight.is_none() && shares.is_none() {
            return Err(IncompletePositionError { symbol });
        }
        Ok(Self { symbol, weight, shares })
    }

    pub fn with_weight(symbol: impl Into<String>, weight: f64) -> Self {
        Self { symbol: symbol.into(), weight: Some(weight), shares: None }
    }

    pub fn with_shares(symbol: impl Into<String>, shares: u64) -> Self {
        Self { symbol: symbol.into(), weight: None, shares: Some(shares) }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn shares(&self) -> Option<u64> {
        self.shares
    }
}

/// Sum of weights, or None if any position lacks a weight
pub fn weight_sum(positions: &[Position]) -> Option<f64> {
    positions.iter().map(|p| p.weight).sum()
}

/// Every position carries a weight and together they sum to 1 within `WEIGHT_SUM_TOLERANCE`
pub fn validate_weights(positions: &[Position]) -> Result<(), WeightValidationError> {
    let Some(sum) = weight_sum(positions) else {
        let unweighted = positions
            .iter()
            .filter(|p| p.weight.is_none())
            .map(|p| p.symbol.clone())
            .collect();
        return Err(WeightValidationError::Unweighted(unweighted));
    };
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(WeightValidationError::SumMismatch { sum });
    }
    Ok(())
}

pub fn weight_map(positions: &[Position]) -> HashMap<String, f64> {
    positions
        .iter()
        .filter_map(|p| p.weight.map(|w| (p.symbol.clone(), w)))
        .collect()
}

pub fn share_map(positions: &[Position]) -> HashMap<String, u64> {
    positions
        .iter()
        .filter_map(|p| p.shares.map(|s| (p.symbol.clone(), s)))
        .collect()
}

/// Result of converting weights to shares: every priced symbol converted, every unpriced one reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShareConversion {
    pub shares: BTreeMap<String, u64>,
    pub missing: Vec<MissingPriceError>,
}

impl ShareConversion {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareChange {
    pub symbol: String,
    pub current: u64,
    pub target: u64,
}

impl ShareChange {
    /// Positive to buy, negative to sell
    pub fn delta(&self) -> i64 {
        self.target as i64 - self.current as i64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharePlan {
    pub changes: Vec<ShareChange>,
    pub target_shares: BTreeMap<String, u64>,
    pub missing: Vec<MissingPriceError>,
}
