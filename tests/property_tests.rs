//! Property tests for conversion, advisory and reshaping invariants.
//!
//! 1. Weights -> shares -> weights stays within the whole-share rounding bound
//! 2. Share counts never spend more than the portfolio value
//! 3. The advisor refuses to give a verdict without both optimized strategies
//! 4. Reshaped simulations always have one row per day and at most 100 path columns

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};

use portfolio_analysis_engine::advisor::rules::advise;
use portfolio_analysis_engine::advisor::types::AdvisorThresholds;
use portfolio_analysis_engine::positions::converter::{portfolio_value, shares_to_weights, weights_to_shares};
use portfolio_analysis_engine::simulation::reshaper::{MAX_DISPLAY_PATHS, reshape_simulation};
use portfolio_analysis_engine::simulation::types::{SimulationPath, SimulationResult};
use portfolio_analysis_engine::strategy::types::{RiskMetrics, StrategyMethod};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Normalized weights and prices for 2..=5 distinct symbols
fn arb_book() -> impl Strategy<Value = (HashMap<String, f64>, HashMap<String, f64>)> {
    prop::collection::vec((0.01..1.0_f64, 1.0..500.0_f64), 2..=5).prop_map(|legs| {
        let raw_total: f64 = legs.iter().map(|(w, _)| w).sum();
        let mut weights = HashMap::new();
        let mut prices = HashMap::new();
        for (i, (raw, price)) in legs.into_iter().enumerate() {
            let symbol = format!("SYM{}", i);
            weights.insert(symbol.clone(), raw / raw_total);
            prices.insert(symbol, (price * 100.0).round() / 100.0);
        }
        (weights, prices)
    })
}

fn arb_metrics() -> impl Strategy<Value = RiskMetrics> {
    (-1.0..3.0_f64, 0.01..0.6_f64, -0.5..0.8_f64).prop_map(|(sharpe, volatility, annualized_return)| RiskMetrics {
        sharpe_ratio: sharpe,
        volatility,
        annualized_return,
        ..RiskMetrics::default()
    })
}

// ── 1-2. Position conversion ─────────────────────────────────────────

proptest! {
    #[test]
    fn round_trip_within_rounding_bound(
        (weights, prices) in arb_book(),
        value in 100_000.0..1_000_000.0_f64,
    ) {
        let conversion = weights_to_shares(&weights, value, &prices);
        prop_assert!(conversion.is_complete());

        let shares: HashMap<String, u64> = conversion.shares.into_iter().collect();
        let round_trip = shares_to_weights(&shares, &prices).unwrap();

        let price_sum: f64 = prices.values().sum();
        let bound = price_sum / (value - price_sum) + 1e-9;
        for (symbol, weight) in &weights {
            let after = round_trip[symbol];
            prop_assert!(
                (after - weight).abs() <= bound,
                "{}: {} -> {} exceeds bound {}", symbol, weight, after, bound
            );
        }
    }

    #[test]
    fn shares_never_overspend(
        (weights, prices) in arb_book(),
        value in 1_000.0..1_000_000.0_f64,
    ) {
        let conversion = weights_to_shares(&weights, value, &prices);
        let shares: HashMap<String, u64> = conversion.shares.into_iter().collect();
        let invested = portfolio_value(&shares, &prices).unwrap();
        let price_sum: f64 = prices.values().sum();
        prop_assert!(invested <= value + price_sum * 1e-9 + 1e-6);
    }
}

// ── 3. Advisor data requirements ─────────────────────────────────────

proptest! {
    #[test]
    fn no_verdict_without_both_optimized_strategies(
        present in prop::collection::vec(any::<bool>(), 5),
        drop_mean_variance in any::<bool>(),
        metrics in prop::collection::vec(arb_metrics(), 5),
    ) {
        let mut table: BTreeMap<StrategyMethod, RiskMetrics> = StrategyMethod::ALL
            .iter()
            .zip(present)
            .zip(metrics)
            .filter(|((_, keep), _)| *keep)
            .map(|((method, _), m)| (*method, m))
            .collect();
        if drop_mean_variance {
            table.remove(&StrategyMethod::MeanVariance);
        } else {
            table.remove(&StrategyMethod::MinimumVariance);
        }

        let err = advise(&table, &AdvisorThresholds::default()).unwrap_err();
        prop_assert!(!err.missing.is_empty());
    }

    #[test]
    fn verdict_is_given_when_all_inputs_present(
        current in arb_metrics(),
        optimized in arb_metrics(),
        min_variance in arb_metrics(),
    ) {
        let table = BTreeMap::from([
            (StrategyMethod::EqualWeight, current),
            (StrategyMethod::MeanVariance, optimized),
            (StrategyMethod::MinimumVariance, min_variance),
        ]);
        let recommendation = advise(&table, &AdvisorThresholds::default()).unwrap();
        prop_assert_eq!(recommendation.current, StrategyMethod::EqualWeight);
        prop_assert!(!recommendation.message.is_empty());
    }
}

// ── 4. Simulation reshaping ──────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn reshaped_chart_shape(
        path_count in 100usize..160,
        horizon in 1usize..300,
        drift in -0.001..0.001_f64,
    ) {
        let path: Vec<f64> = (0..horizon).map(|d| 10_000.0 * (1.0 + drift).powi(d as i32)).collect();
        let sim = SimulationResult {
            num_simulations: path_count,
            time_horizon_days: horizon,
            initial_value: 10_000.0,
            paths: (0..path_count)
                .map(|_| SimulationPath { dates: Vec::new(), values: path.clone() })
                .collect(),
            percentile_5th: path.iter().map(|v| v * 0.9).collect(),
            percentile_95th: path.iter().map(|v| v * 1.1).collect(),
        };

        let chart = reshape_simulation(&sim);
        prop_assert_eq!(chart.rows.len(), horizon);
        prop_assert_eq!(chart.path_count, MAX_DISPLAY_PATHS);
        for (day, row) in chart.rows.iter().enumerate() {
            prop_assert_eq!(row.day, day);
            prop_assert_eq!(row.paths.len(), MAX_DISPLAY_PATHS);
            prop_assert!(row.paths.iter().all(Option::is_some));
            prop_assert!(row.percentile_5th.is_some() && row.percentile_95th.is_some());
        }
    }
}
