use serde::Serialize;

use crate::strategy::types::StrategyMethod;

/// Decision thresholds of the rebalancing rule.
/// These are policy values rather than derived ones, so they are configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisorThresholds {
    /// Relative Sharpe improvement (percent) the optimized allocation must exceed
    pub min_sharpe_improvement_pct: f64,
    /// Minimum-variance volatility must be below this fraction of current volatility
    pub max_volatility_ratio: f64,
    /// Minimum-variance return must be at least this fraction of current return
    pub min_return_ratio: f64,
}

impl Default for AdvisorThresholds {
    fn default() -> Self {
        Self {
            min_sharpe_improvement_pct: 10.0,
            max_volatility_ratio: 0.90,
            min_return_ratio: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    RebalanceRecommended {
        current_sharpe: f64,
        optimized_sharpe: f64,
        /// None when the current Sharpe is zero and a relative figure is undefined
        improvement_pct: Option<f64>,
    },
    RiskReductionOpportunity {
        current_volatility: f64,
        min_variance_volatility: f64,
        volatility_reduction_pct: f64,
        current_return: f64,
        min_variance_return: f64,
    },
    CurrentAllocationAcceptable {
        current_sharpe: f64,
        optimized_sharpe: f64,
        current_volatility: f64,
        min_variance_volatility: f64,
    },
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::RebalanceRecommended { .. } => "rebalance recommended",
            Verdict::RiskReductionOpportunity { .. } => "risk reduction opportunity",
            Verdict::CurrentAllocationAcceptable { .. } => "current allocation acceptable",
        }
    }
}

/// The advisor's single output: the verdict, which strategy stood for "current", and the message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub current: StrategyMethod,
    pub verdict: Verdict,
    pub message: String,
}
