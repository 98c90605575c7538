use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EvaluatorFailure;
use crate::series::types::{AlignedSeries, EquityCurvePoint};
use super::strategy_constants::DEGRADED_TIMEOUT_COUNT;

/// The fixed set of strategy evaluators, declared in presentation priority order.
/// `Ord` follows declaration order, so maps keyed by method iterate by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMethod {
    ActualHoldings,
    EqualWeight,
    MeanVariance,
    MinimumVariance,
    BlackLitterman,
}

impl StrategyMethod {
    pub const ALL: [StrategyMethod; 5] = [
        Self::ActualHoldings,
        Self::EqualWeight,
        Self::MeanVariance,
        Self::MinimumVariance,
        Self::BlackLitterman,
    ];

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "actual_holdings" => Some(Self::ActualHoldings),
            "equal_weight" => Some(Self::EqualWeight),
            "mean_variance" => Some(Self::MeanVariance),
            "minimum_variance" => Some(Self::MinimumVariance),
            "black_litterman" => Some(Self::BlackLitterman),
            _ => None,
        }
    }

    /// Path segment used by the analytics API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActualHoldings => "actual_holdings",
            Self::EqualWeight => "equal_weight",
            Self::MeanVariance => "mean_variance",
            Self::MinimumVariance => "minimum_variance",
            Self::BlackLitterman => "black_litterman",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ActualHoldings => "Actual Holdings",
            Self::EqualWeight => "Equal Weight",
            Self::MeanVariance => "Mean-Variance Optimized",
            Self::MinimumVariance => "Minimum Variance",
            Self::BlackLitterman => "Black-Litterman",
        }
    }
}

/// Risk metrics of one evaluated strategy; returns, volatility and drawdown in percent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    #[serde(default)]
    pub rolling_sharpe_20d: Option<f64>,
    #[serde(default)]
    pub rolling_sharpe_60d: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub label: String,
    #[serde(alias = "equity_curve")]
    pub curve: Vec<EquityCurvePoint>,
    pub metrics: RiskMetrics,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// One line of the strategy comparison table
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub method: StrategyMethod,
    pub label: String,
    pub metrics: RiskMetrics,
}

/// Settled outcome of one aggregation batch
#[derive(Debug, Clone, Default)]
pub struct StrategyComparison {
    pub portfolio_id: String,
    /// Successful results only, iterating in priority order
    pub results: BTreeMap<StrategyMethod, StrategyResult>,
    pub failures: Vec<EvaluatorFailure>,
    /// Successful equity curves on the first available curve's date index
    pub aligned: AlignedSeries,
}

impl StrategyComparison {
    pub fn get(&self, method: StrategyMethod) -> Option<&StrategyResult> {
        self.results.get(&method)
    }

    pub fn failed_methods(&self) -> Vec<StrategyMethod> {
        self.failures.iter().map(|f| f.method).collect()
    }

    pub fn timed_out_count(&self) -> usize {
        self.failures.iter().filter(|f| f.timed_out()).count()
    }

    /// Several evaluators ran out the batch deadline at once
    pub fn degraded(&self) -> bool {
        self.timed_out_count() >= DEGRADED_TIMEOUT_COUNT
    }

    pub fn metrics_table(&self) -> Vec<MetricsRow> {
        self.results
            .iter()
            .map(|(method, result)| MetricsRow {
                method: *method,
                label: method.label().to_string(),
                metrics: result.metrics,
            })
            .collect()
    }

    pub fn log_comparison(&self) {
        let table = self
            .metrics_table()
            .iter()
            .map(|row| {
                format!(
                    "{}: Return={:.2}% (ann. {:.2}%), Vol={:.2}%, Sharpe={:.3}, MaxDD={:.2}%",
                    row.label,
                    row.metrics.total_return,
                    row.metrics.annualized_return,
                    row.metrics.volatility,
                    row.metrics.sharpe_ratio,
                    row.metrics.max_drawdown
                )
            })
            .collect::<Vec<_>>()
            .join("\n  ");

        let failed = self
            .failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("\n  ");

        info!(
            "Strategy comparison for {} ({} points aligned):\n  {}\n\nOmitted strategies:\n  {}",
            self.portfolio_id,
            self.aligned.len(),
            table,
            if failed.is_empty() { "none".to_string() } else { failed }
        );
    }
}
