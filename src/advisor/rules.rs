use std::collections::BTreeMap;
use tracing::{info, instrument};

use super::types::{AdvisorThresholds, Recommendation, Verdict};
use crate::error::InsufficientDataError;
use crate::strategy::types::{RiskMetrics, StrategyComparison, StrategyMethod};

/// Below this magnitude a Sharpe ratio is treated as zero and relative improvement is undefined
const SHARPE_EPSILON: f64 = 1e-12;

/// Float slack on the improvement threshold, so exactly 10% (computed as 10.000000000000009) does not pass
const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Rebalancing recommendation from the settled metrics of a strategy comparison
pub fn advise_comparison(
    comparison: &StrategyComparison,
    thresholds: &AdvisorThresholds,
) -> Result<Recommendation, InsufficientDataError> {
    let metrics: BTreeMap<StrategyMethod, RiskMetrics> = comparison
        .results
        .iter()
        .map(|(method, result)| (*method, result.metrics))
        .collect();
    advise(&metrics, thresholds)
}

/// Deterministic rebalancing rule.
///
/// Current is Actual Holdings, else Equal Weight. Needs current, Mean-Variance and
/// Minimum Variance metrics, otherwise no verdict is given at all. Rules, first match wins:
/// 1. optimized Sharpe beats current by more than the improvement threshold: rebalance.
///    Improvement is `(optimized - current) / |current| * 100`, so with a negative current
///    Sharpe a higher optimized Sharpe is still a positive improvement
/// 2. min-variance volatility below the volatility ratio of current and min-variance return
///    at least the return ratio of current: risk reduction opportunity
/// 3. otherwise the current allocation is acceptable
#[instrument(skip_all, fields(n_strategies = metrics.len()))]
pub fn advise(
    metrics: &BTreeMap<StrategyMethod, RiskMetrics>,
    thresholds: &AdvisorThresholds,
) -> Result<Recommendation, InsufficientDataError> {
    let current = [StrategyMethod::ActualHoldings, StrategyMethod::EqualWeight]
        .into_iter()
        .find_map(|method| metrics.get(&method).map(|m| (method, m)));
    let optimized = metrics.get(&StrategyMethod::MeanVariance);
    let min_variance = metrics.get(&StrategyMethod::MinimumVariance);

    let (Some((current_method, current)), Some(optimized), Some(min_variance)) =
        (current, optimized, min_variance)
    else {
        let mut missing = Vec::new();
        if current.is_none() {
            missing.push(format!(
                "{} or {}",
                StrategyMethod::ActualHoldings.label(),
                StrategyMethod::EqualWeight.label()
            ));
        }
        if optimized.is_none() {
            missing.push(StrategyMethod::MeanVariance.label().to_string());
        }
        if min_variance.is_none() {
            missing.push(StrategyMethod::MinimumVariance.label().to_string());
        }
        info!(?missing, "Not enough strategy metrics for a recommendation");
        return Err(InsufficientDataError { missing });
    };

    let current_sharpe = current.sharpe_ratio;
    let optimized_sharpe = optimized.sharpe_ratio;
    let improvement_pct = if current_sharpe.abs() < SHARPE_EPSILON {
        None
    } else {
        Some((optimized_sharpe - current_sharpe) / current_sharpe.abs() * 100.0)
    };
    let rebalance = match improvement_pct {
        Some(pct) => pct > thresholds.min_sharpe_improvement_pct + IMPROVEMENT_EPSILON,
        None => optimized_sharpe > current_sharpe,
    };

    let verdict = if rebalance {
        Verdict::RebalanceRecommended {
            current_sharpe,
            optimized_sharpe,
            improvement_pct,
        }
    } else if current.volatility > 0.0
        && min_variance.volatility < thresholds.max_volatility_ratio * current.volatility
        && min_variance.annualized_return >= thresholds.min_return_ratio * current.annualized_return
    {
        Verdict::RiskReductionOpportunity {
            current_volatility: current.volatility,
            min_variance_volatility: min_variance.volatility,
            volatility_reduction_pct: (current.volatility - min_variance.volatility) / current.volatility * 100.0,
            current_return: current.annualized_return,
            min_variance_return: min_variance.annualized_return,
        }
    } else {
        Verdict::CurrentAllocationAcceptable {
            current_sharpe,
            optimized_sharpe,
            current_volatility: current.volatility,
            min_variance_volatility: min_variance.volatility,
        }
    };

    let message = render_message(current_method, &verdict);
    info!(current = current_method.as_str(), verdict = verdict.as_str(), %message, "Rebalancing recommendation");

    Ok(Recommendation {
        current: current_method,
        verdict,
        message,
    })
}

fn render_message(current: StrategyMethod, verdict: &Verdict) -> String {
    let current_label = current.label();
    match *verdict {
        Verdict::RebalanceRecommended { current_sharpe, optimized_sharpe, improvement_pct } => {
            let improvement = improvement_pct
                .map(|pct| format!(", a {:.1}% improvement", pct))
                .unwrap_or_default();
            format!(
                "Rebalance recommended: the {} allocation has a Sharpe ratio of {:.2} versus {:.2} for {}{}.",
                StrategyMethod::MeanVariance.label(),
                optimized_sharpe,
                current_sharpe,
                current_label,
                improvement
            )
        }
        Verdict::RiskReductionOpportunity {
            current_volatility,
            min_variance_volatility,
            volatility_reduction_pct,
            current_return,
            min_variance_return,
        } => format!(
            "Risk reduction opportunity: the {} allocation lowers volatility from {:.2}% to {:.2}% (a {:.1}% reduction) with an annualized return of {:.2}% versus {:.2}% for {}.",
            StrategyMethod::MinimumVariance.label(),
            current_volatility,
            min_variance_volatility,
            volatility_reduction_pct,
            min_variance_return,
            current_return,
            current_label
        ),
        Verdict::CurrentAllocationAcceptable {
            current_sharpe,
            optimized_sharpe,
            current_volatility,
            min_variance_volatility,
        } => format!(
            "Current allocation acceptable: {} has a Sharpe ratio of {:.2} versus {:.2} optimized, and volatility of {:.2}% versus {:.2}% at minimum variance.",
            current_label,
            current_sharpe,
            optimized_sharpe,
            current_volatility,
            min_variance_volatility
        ),
    }
}
