use std::fmt;
use thiserror::Error;

use crate::strategy::types::StrategyMethod;

/// A live price required for a conversion was absent (or unusable) for one symbol
#[derive(Debug, Clone, PartialEq, Error)]
#[error("No usable live price for {symbol}")]
pub struct MissingPriceError {
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConverterError {
    #[error("Missing live prices for: {}", .0.join(", "))]
    MissingPrices(Vec<String>),

    #[error("Portfolio has zero total value; weights are undefined")]
    EmptyPortfolio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Failed(String),
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Failed(msg) => write!(f, "failed: {}", msg),
            FailureReason::TimedOut => write!(f, "timed out"),
        }
    }
}

/// One named strategy evaluator failed; its result is omitted from the comparison
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} evaluation {reason}", .method.label())]
pub struct EvaluatorFailure {
    pub method: StrategyMethod,
    pub reason: FailureReason,
}

impl EvaluatorFailure {
    pub fn timed_out(&self) -> bool {
        matches!(self.reason, FailureReason::TimedOut)
    }
}

/// The advisor needs current, mean-variance and minimum-variance metrics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Insufficient data for a recommendation: missing {}", .missing.join(", "))]
pub struct InsufficientDataError {
    pub missing: Vec<String>,
}

/// A response that arrived after its request generation was superseded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Response for generation {token} discarded (current generation is {current})")]
pub struct StaleResponseDiscarded {
    pub token: u64,
    pub current: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationShapeError {
    #[error("percentile_5th has {actual} points, expected {expected}")]
    Percentile5thLength { expected: usize, actual: usize },

    #[error("percentile_95th has {actual} points, expected {expected}")]
    Percentile95thLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Position {symbol} has neither a weight nor a share count")]
pub struct IncompletePositionError {
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightValidationError {
    #[error("Positions without a weight: {}", .0.join(", "))]
    Unweighted(Vec<String>),

    #[error("Weights sum to {sum}, expected 1.0")]
    SumMismatch { sum: f64 },
}
