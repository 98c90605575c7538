use std::collections::{BTreeMap, BTreeSet};
use chrono::NaiveDate;
use tracing::{instrument, warn};

use super::types::{ComparisonChart, ComparisonRow, ComparisonSeries};

/// Percent-change-from-start series for several tickers, merged on the union of their dates.
///
/// Every ticker is normalized against its own first close, so each series starts at 0.0
/// regardless of how long the others are. Tickers with no usable start price produce no
/// points and are listed in `undefined_tickers`. A date repeated within one ticker keeps
/// its first observation.
#[instrument(skip(series), fields(n_tickers = series.len()))]
pub fn normalize_comparison(series: &[ComparisonSeries]) -> ComparisonChart {
    let tickers: Vec<String> = series.iter().map(|s| s.ticker.clone()).collect();
    let mut undefined_tickers = Vec::new();

    let normalized: Vec<Vec<(NaiveDate, f64)>> = series
        .iter()
        .map(|s| {
            if s.normalized_return(0.0).is_none() {
                warn!(ticker = %s.ticker, start_price = ?s.start_price(), "No usable start price, skipping ticker");
                undefined_tickers.push(s.ticker.clone());
                return Vec::new();
            }
            let mut seen = BTreeSet::new();
            s.points
                .iter()
                .filter(|p| {
                    let first = seen.insert(p.date);
                    if !first {
                        warn!(ticker = %s.ticker, date = %p.date, close = p.close, "Duplicate date, keeping first observation");
                    }
                    first
                })
                .filter_map(|p| s.normalized_return(p.close).map(|r| (p.date, r)))
                .collect()
        })
        .collect();

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (col, points) in normalized.iter().enumerate() {
        for &(date, value) in points {
            by_date.entry(date).or_insert_with(|| vec![None; tickers.len()])[col] = Some(value);
        }
    }
    let rows = by_date
        .into_iter()
        .map(|(date, values)| ComparisonRow { date, values })
        .collect();

    ComparisonChart {
        tickers,
        normalized,
        rows,
        undefined_tickers,
    }
}
