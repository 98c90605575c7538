use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One snapshot of portfolio value on an equity curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentWarning {
    /// Secondary series ends before the reference; later rows carry no point for it
    ShorterThanReference { label: String, len: usize, reference_len: usize },
    /// Secondary series runs past the reference; the extra points are not charted
    SurplusIgnored { label: String, dropped: usize },
    /// Secondary dates disagree with the reference at `count` indices (first at `first_index`)
    DateMismatch { label: String, first_index: usize, count: usize },
}

/// One merged row, labelled by the reference date, one column per input curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    pub labels: Vec<String>,
    pub rows: Vec<AlignedRow>,
    pub warnings: Vec<AlignmentWarning>,
}

impl AlignedSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// The column for `label` as (date, value) pairs, skipping rows where it has no point
    pub fn column(&self, label: &str) -> Vec<(NaiveDate, f64)> {
        let Some(idx) = self.column_index(label) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.values.get(idx).copied().flatten().map(|v| (row.date, v)))
            .collect()
    }
}

/// One close price observation for a ticker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// One ticker's close series for the multi-ticker comparison chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl ComparisonSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self { ticker: ticker.into(), points }
    }

    /// First observed close, if any
    pub fn start_price(&self) -> Option<f64> {
        self.points.first().map(|p| p.close)
    }

    /// Percent change of `close` from the start price; undefined without a usable start price
    pub fn normalized_return(&self, close: f64) -> Option<f64> {
        let start = self.start_price()?;
        if start == 0.0 || !start.is_finite() {
            return None;
        }
        Some((close - start) / start * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub date: NaiveDate,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonChart {
    pub tickers: Vec<String>,
    /// Per-ticker percent-change series, each starting at its own first observation
    pub normalized: Vec<Vec<(NaiveDate, f64)>>,
    /// Union of all dates, one column per ticker
    pub rows: Vec<ComparisonRow>,
    /// Tickers without a usable start price
    pub undefined_tickers: Vec<String>,
}
