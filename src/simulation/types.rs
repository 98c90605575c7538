use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SimulationShapeError;

/// One simulated value path. Dates are the simulator's labels and are not shared across paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPath {
    #[serde(default)]
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

/// Monte-Carlo output as produced by the analytics service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub num_simulations: usize,
    pub time_horizon_days: usize,
    pub initial_value: f64,
    pub paths: Vec<SimulationPath>,
    pub percentile_5th: Vec<f64>,
    pub percentile_95th: Vec<f64>,
}

impl SimulationResult {
    /// Both percentile bands must have exactly one point per horizon day
    pub fn validate(&self) -> Result<(), SimulationShapeError> {
        let expected = self.time_horizon_days;
        if self.percentile_5th.len() != expected {
            return Err(SimulationShapeError::Percentile5thLength {
                expected,
                actual: self.percentile_5th.len(),
            });
        }
        if self.percentile_95th.len() != expected {
            return Err(SimulationShapeError::Percentile95thLength {
                expected,
                actual: self.percentile_95th.len(),
            });
        }
        Ok(())
    }
}

/// One chart row per trading-day offset; absent cells mean "no point".
/// Serializes flat as `{day, percentile_5th, percentile_95th, path0, path1, ...}`
/// with absent cells left out.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRow {
    pub day: usize,
    pub percentile_5th: Option<f64>,
    pub percentile_95th: Option<f64>,
    pub paths: Vec<Option<f64>>,
}

impl Serialize for SimulationRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("day", &self.day)?;
        if let Some(p5) = self.percentile_5th {
            map.serialize_entry("percentile_5th", &p5)?;
        }
        if let Some(p95) = self.percentile_95th {
            map.serialize_entry("percentile_95th", &p95)?;
        }
        for (i, value) in self.paths.iter().enumerate() {
            if let Some(value) = value {
                map.serialize_entry(&format!("path{}", i), value)?;
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationChart {
    pub path_count: usize,
    pub rows: Vec<SimulationRow>,
}

/// Distribution of final values across every simulated path
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub paths_used: usize,
    pub mean_final_value: f64,
    pub median_final_value: f64,
    pub final_value_5th: f64,
    pub final_value_95th: f64,
    /// Fraction of paths ending below the initial value
    pub probability_of_loss: f64,
    /// Median of per-path max drawdown, in percent
    pub median_max_drawdown: f64,
}

/// Value-at-Risk response for a portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarResult {
    pub var_percent: f64,
    pub var_value: f64,
    pub cvar_percent: f64,
    pub cvar_value: f64,
    pub historical_var: f64,
    pub parametric_var: f64,
}
