use std::collections::{BTreeSet, HashMap};
use tracing::{info, instrument};

use super::converter::weights_to_shares;
use super::types::{ShareChange, SharePlan};

/// Share-count changes that move `current_shares` to `target_weights` at `portfolio_value`.
///
/// Symbols held but absent from the targets are sold down to zero. Targets that cannot be
/// priced are reported as missing and their holdings are left untouched. Unchanged symbols
/// are omitted from `changes`.
#[instrument(skip_all, fields(portfolio_value = portfolio_value))]
pub fn plan_share_changes(
    current_shares: &HashMap<String, u64>,
    target_weights: &HashMap<String, f64>,
    portfolio_value: f64,
    prices: &HashMap<String, f64>,
) -> SharePlan {
    let conversion = weights_to_shares(target_weights, portfolio_value, prices);
    let unpriced: BTreeSet<&str> = conversion.missing.iter().map(|m| m.symbol.as_str()).collect();

    let symbols: BTreeSet<&String> = current_shares.keys().chain(target_weights.keys()).collect();
    let mut changes = Vec::new();

    for symbol in symbols {
        if unpriced.contains(symbol.as_str()) {
            continue;
        }
        let current = current_shares.get(symbol).copied().unwrap_or(0);
        let target = conversion.shares.get(symbol).copied().unwrap_or(0);
        if current != target {
            changes.push(ShareChange {
                symbol: symbol.clone(),
                current,
                target,
            });
        }
    }

    info!(
        changes = changes.len(),
        missing = conversion.missing.len(),
        "Share rebalance plan built"
    );

    SharePlan {
        changes,
        target_shares: conversion.shares,
        missing: conversion.missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<V: Copy>(entries: &[(&str, V)]) -> HashMap<String, V> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn buys_sells_and_exits() {
        let current = map(&[("A", 100u64), ("B", 160u64), ("OLD", 10u64)]);
        let target = map(&[("A", 0.6), ("B", 0.4)]);
        let prices = map(&[("A", 50.0), ("B", 25.0)]);

        let plan = plan_share_changes(&current, &target, 10_000.0, &prices);

        assert_eq!(
            plan.changes,
            vec![
                ShareChange { symbol: "A".to_string(), current: 100, target: 120 },
                ShareChange { symbol: "OLD".to_string(), current: 10, target: 0 },
            ]
        );
        assert_eq!(plan.changes[0].delta(), 20);
        assert_eq!(plan.changes[1].delta(), -10);
        assert!(plan.missing.is_empty());
    }

    #[test]
    fn unpriced_targets_are_left_alone() {
        let current = map(&[("A", 10u64), ("B", 10u64)]);
        let target = map(&[("A", 0.5), ("B", 0.5)]);
        let prices = map(&[("A", 50.0)]);

        let plan = plan_share_changes(&current, &target, 10_000.0, &prices);

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].symbol, "A");
        assert_eq!(plan.changes[0].target, 100);
        assert_eq!(plan.missing.len(), 1);
        assert_eq!(plan.missing[0].symbol, "B");
    }
}
