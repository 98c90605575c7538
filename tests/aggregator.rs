//! Strategy aggregation: partial failure, batch timeout, priority ordering and stale responses.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDate;
use portfolio_analysis_engine::error::FailureReason;
use portfolio_analysis_engine::series::types::EquityCurvePoint;
use portfolio_analysis_engine::strategy::aggregator::{
    StrategyComparisonLoader, StrategyEvaluator, aggregate_strategies,
};
use portfolio_analysis_engine::strategy::types::{RiskMetrics, StrategyMethod, StrategyResult};

/// Evaluator whose calls finish after a per-method delay, optionally failing
struct ScriptedEvaluator {
    delays_ms: HashMap<StrategyMethod, u64>,
    failing: HashSet<StrategyMethod>,
    curve_len: HashMap<StrategyMethod, usize>,
}

impl ScriptedEvaluator {
    fn new(delays_ms: &[(StrategyMethod, u64)]) -> Self {
        Self {
            delays_ms: delays_ms.iter().copied().collect(),
            failing: HashSet::new(),
            curve_len: HashMap::new(),
        }
    }

    fn failing(mut self, method: StrategyMethod) -> Self {
        self.failing.insert(method);
        self
    }

    fn curve_len(mut self, method: StrategyMethod, len: usize) -> Self {
        self.curve_len.insert(method, len);
        self
    }
}

fn result_for(method: StrategyMethod, len: usize) -> StrategyResult {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    StrategyResult {
        label: method.label().to_string(),
        curve: (0..len)
            .map(|i| EquityCurvePoint {
                date: start + chrono::Duration::days(i as i64),
                value: 10_000.0 + i as f64,
            })
            .collect(),
        metrics: RiskMetrics {
            sharpe_ratio: 1.0,
            ..RiskMetrics::default()
        },
        weights: HashMap::new(),
    }
}

impl StrategyEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, _portfolio_id: &str, method: StrategyMethod) -> eyre::Result<StrategyResult> {
        let delay = self.delays_ms.get(&method).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if self.failing.contains(&method) {
            eyre::bail!("share counts not set for {}", method.as_str());
        }
        Ok(result_for(method, self.curve_len.get(&method).copied().unwrap_or(5)))
    }
}

fn all_with_delays(delays: [u64; 5]) -> Vec<(StrategyMethod, u64)> {
    StrategyMethod::ALL.iter().copied().zip(delays).collect()
}

#[tokio::test(start_paused = true)]
async fn order_follows_priority_whatever_finishes_first() {
    let permutations = [
        [10, 20, 30, 40, 50],
        [50, 40, 30, 20, 10],
        [30, 10, 50, 20, 40],
        [20, 50, 10, 40, 30],
    ];
    for delays in permutations {
        let evaluator = ScriptedEvaluator::new(&all_with_delays(delays));
        let comparison =
            aggregate_strategies(&evaluator, "p-1", &StrategyMethod::ALL, Duration::from_secs(5)).await;

        let order: Vec<StrategyMethod> = comparison.results.keys().copied().collect();
        assert_eq!(order, StrategyMethod::ALL.to_vec(), "delays {:?}", delays);
        assert!(comparison.failures.is_empty());
        assert_eq!(comparison.aligned.labels[0], "Actual Holdings");
    }
}

#[tokio::test(start_paused = true)]
async fn failed_evaluator_is_omitted_not_zeroed() {
    let evaluator = ScriptedEvaluator::new(&all_with_delays([10, 10, 10, 10, 10]))
        .failing(StrategyMethod::ActualHoldings);

    let comparison =
        aggregate_strategies(&evaluator, "p-1", &StrategyMethod::ALL, Duration::from_secs(5)).await;

    assert!(comparison.get(StrategyMethod::ActualHoldings).is_none());
    assert_eq!(comparison.results.len(), 4);
    assert_eq!(comparison.failed_methods(), vec![StrategyMethod::ActualHoldings]);
    assert!(matches!(comparison.failures[0].reason, FailureReason::Failed(ref msg) if msg.contains("share counts")));
    // next available strategy becomes the reference curve
    assert_eq!(comparison.aligned.labels[0], "Equal Weight");
    assert_eq!(comparison.metrics_table().len(), 4);
    assert!(!comparison.degraded());
}

#[tokio::test(start_paused = true)]
async fn slow_evaluators_time_out_as_one_batch() {
    let evaluator = ScriptedEvaluator::new(&all_with_delays([100, 200, 5_000, 300, 9_000]));

    let comparison =
        aggregate_strategies(&evaluator, "p-1", &StrategyMethod::ALL, Duration::from_secs(1)).await;

    let order: Vec<StrategyMethod> = comparison.results.keys().copied().collect();
    assert_eq!(
        order,
        vec![StrategyMethod::ActualHoldings, StrategyMethod::EqualWeight, StrategyMethod::MinimumVariance]
    );
    assert_eq!(comparison.timed_out_count(), 2);
    assert!(comparison.failures.iter().all(|f| f.reason == FailureReason::TimedOut));
    assert!(comparison.degraded());
}

#[tokio::test(start_paused = true)]
async fn unequal_curves_are_aligned_on_reference() {
    let evaluator = ScriptedEvaluator::new(&all_with_delays([1, 1, 1, 1, 1]))
        .curve_len(StrategyMethod::ActualHoldings, 10)
        .curve_len(StrategyMethod::BlackLitterman, 4);

    let comparison =
        aggregate_strategies(&evaluator, "p-1", &StrategyMethod::ALL, Duration::from_secs(5)).await;

    assert_eq!(comparison.aligned.len(), 10);
    let last = comparison.aligned.rows.last().unwrap();
    assert_eq!(last.values.len(), 5);
    assert_eq!(last.values[4], None);
    assert!(!comparison.aligned.warnings.is_empty());
}

#[tokio::test(start_paused = true)]
async fn duplicate_methods_are_evaluated_once() {
    let evaluator = ScriptedEvaluator::new(&all_with_delays([1, 1, 1, 1, 1]));
    let comparison = aggregate_strategies(
        &evaluator,
        "p-1",
        &[StrategyMethod::MeanVariance, StrategyMethod::EqualWeight, StrategyMethod::MeanVariance],
        Duration::from_secs(5),
    )
    .await;

    let order: Vec<StrategyMethod> = comparison.results.keys().copied().collect();
    assert_eq!(order, vec![StrategyMethod::EqualWeight, StrategyMethod::MeanVariance]);
}

#[tokio::test(start_paused = true)]
async fn response_after_teardown_is_discarded() {
    let loader = StrategyComparisonLoader::new(
        ScriptedEvaluator::new(&all_with_delays([100, 100, 100, 100, 100])),
        Duration::from_secs(5),
    );
    let generation = loader.generation();

    let (outcome, _) = tokio::join!(loader.load("p-1"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        generation.invalidate();
    });

    let stale = outcome.unwrap_err();
    assert_eq!(stale.token, 1);
    assert_eq!(stale.current, 2);
}

#[tokio::test(start_paused = true)]
async fn newer_load_supersedes_older_one() {
    let loader = StrategyComparisonLoader::new(
        ScriptedEvaluator::new(&all_with_delays([100, 100, 100, 100, 100])),
        Duration::from_secs(5),
    )
    .with_methods(&[StrategyMethod::EqualWeight]);

    let (first, second) = tokio::join!(loader.load("p-1"), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        loader.load("p-2").await
    });

    assert!(first.is_err());
    let second = second.unwrap();
    assert_eq!(second.portfolio_id, "p-2");
    assert_eq!(second.results.len(), 1);
}
