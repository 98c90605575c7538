use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};

use super::generation::RequestGeneration;
use super::types::{StrategyComparison, StrategyMethod, StrategyResult};
use crate::error::{EvaluatorFailure, FailureReason, StaleResponseDiscarded};
use crate::series::aligner::align_curves;

/// Computes one strategy's backtest for a portfolio
pub trait StrategyEvaluator {
    fn evaluate(
        &self,
        portfolio_id: &str,
        method: StrategyMethod,
    ) -> impl Future<Output = eyre::Result<StrategyResult>> + Send;
}

/// Evaluate every requested strategy concurrently and settle them into one comparison.
///
/// All calls share a single deadline `timeout` from now; calls still pending at the
/// deadline are omitted as timed out, failed calls are omitted as failed. Nothing is
/// retried. Results come back in priority order whatever order the calls finished in.
#[instrument(skip(evaluator), fields(on_close = true))]
pub async fn aggregate_strategies<E: StrategyEvaluator>(
    evaluator: &E,
    portfolio_id: &str,
    methods: &[StrategyMethod],
    timeout: Duration,
) -> StrategyComparison {
    let deadline = Instant::now() + timeout;
    let methods: BTreeSet<StrategyMethod> = methods.iter().copied().collect();
    debug!(n_methods = methods.len(), "Dispatching strategy evaluations");

    let settled = join_all(methods.into_iter().map(|method| async move {
        let outcome = timeout_at(deadline, evaluator.evaluate(portfolio_id, method)).await;
        (method, outcome)
    }))
    .await;

    let mut results = BTreeMap::new();
    let mut failures = Vec::new();
    for (method, outcome) in settled {
        match outcome {
            Ok(Ok(result)) => {
                results.insert(method, result);
            }
            Ok(Err(e)) => {
                warn!(strategy = method.as_str(), error = ?e, "Strategy evaluation failed, omitting");
                failures.push(EvaluatorFailure {
                    method,
                    reason: FailureReason::Failed(format!("{:#}", e)),
                });
            }
            Err(_) => {
                warn!(strategy = method.as_str(), timeout = ?timeout, "Strategy evaluation timed out, omitting");
                failures.push(EvaluatorFailure {
                    method,
                    reason: FailureReason::TimedOut,
                });
            }
        }
    }

    let curves: Vec<(String, &[_])> = results
        .iter()
        .map(|(method, result)| (method.label().to_string(), result.curve.as_slice()))
        .collect();
    let aligned = align_curves(&curves);

    let comparison = StrategyComparison {
        portfolio_id: portfolio_id.to_string(),
        results,
        failures,
        aligned,
    };

    if comparison.degraded() {
        warn!(
            timed_out = comparison.timed_out_count(),
            "Several strategies timed out, comparison is degraded"
        );
    }
    info!(
        succeeded = comparison.results.len(),
        failed = comparison.failures.len(),
        "Strategy aggregation settled"
    );
    comparison
}

/// Loads strategy comparisons for a view, dropping responses that arrive after the view moved on
pub struct StrategyComparisonLoader<E> {
    evaluator: E,
    methods: Vec<StrategyMethod>,
    timeout: Duration,
    generation: Arc<RequestGeneration>,
}

impl<E: StrategyEvaluator> StrategyComparisonLoader<E> {
    pub fn new(evaluator: E, timeout: Duration) -> Self {
        Self {
            evaluator,
            methods: StrategyMethod::ALL.to_vec(),
            timeout,
            generation: Arc::new(RequestGeneration::new()),
        }
    }

    pub fn with_methods(mut self, methods: &[StrategyMethod]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Shared handle for the view to invalidate on teardown
    pub fn generation(&self) -> Arc<RequestGeneration> {
        Arc::clone(&self.generation)
    }

    pub async fn load(&self, portfolio_id: &str) -> Result<StrategyComparison, StaleResponseDiscarded> {
        let token = self.generation.begin();
        let comparison = aggregate_strategies(&self.evaluator, portfolio_id, &self.methods, self.timeout).await;
        self.generation.accept(token, comparison).inspect_err(|stale| {
            debug!(token = stale.token, current = stale.current, "Discarding stale strategy comparison");
        })
    }
}
