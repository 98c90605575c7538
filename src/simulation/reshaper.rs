use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use super::types::{SimulationChart, SimulationResult, SimulationRow, SimulationSummary};

/// Paths shown on the Monte-Carlo chart; always the first ones, never a random sample
pub const MAX_DISPLAY_PATHS: usize = 100;

/// Reshape a simulation for charting: the first `MAX_DISPLAY_PATHS` paths and both
/// percentile bands, one row per trading-day offset `0..time_horizon_days`.
/// Paths or bands that end early leave the later cells empty.
#[instrument(skip(sim), fields(paths = sim.paths.len(), horizon = sim.time_horizon_days))]
pub fn reshape_simulation(sim: &SimulationResult) -> SimulationChart {
    if let Err(e) = sim.validate() {
        warn!(error = %e, "Simulation percentile bands do not match the horizon");
    }

    let shown = &sim.paths[..sim.paths.len().min(MAX_DISPLAY_PATHS)];
    let short_paths = shown
        .iter()
        .filter(|p| p.values.len() < sim.time_horizon_days)
        .count();
    if short_paths > 0 {
        warn!(short_paths, "Some simulated paths end before the horizon");
    }

    let rows = (0..sim.time_horizon_days)
        .map(|day| SimulationRow {
            day,
            percentile_5th: sim.percentile_5th.get(day).copied(),
            percentile_95th: sim.percentile_95th.get(day).copied(),
            paths: shown.iter().map(|p| p.values.get(day).copied()).collect(),
        })
        .collect();

    debug!(path_count = shown.len(), "Simulation reshaped");
    SimulationChart {
        path_count: shown.len(),
        rows,
    }
}

/// Final-value distribution over all paths (not only the displayed ones)
#[instrument(skip(sim), fields(paths = sim.paths.len()))]
pub fn summarize_simulation(sim: &SimulationResult) -> Option<SimulationSummary> {
    let per_path: Vec<(f64, f64)> = sim
        .paths
        .par_iter()
        .filter_map(|p| p.values.last().map(|&last| (last, max_drawdown(&p.values))))
        .collect();
    if per_path.is_empty() {
        return None;
    }

    let mut finals: Vec<f64> = per_path.iter().map(|(f, _)| *f).collect();
    let mut drawdowns: Vec<f64> = per_path.iter().map(|(_, dd)| *dd).collect();
    finals.sort_by(f64::total_cmp);
    drawdowns.sort_by(f64::total_cmp);

    let n = finals.len();
    let losses = finals.iter().filter(|&&v| v < sim.initial_value).count();

    Some(SimulationSummary {
        paths_used: n,
        mean_final_value: finals.iter().sum::<f64>() / n as f64,
        median_final_value: percentile(&finals, 0.5),
        final_value_5th: percentile(&finals, 0.05),
        final_value_95th: percentile(&finals, 0.95),
        probability_of_loss: losses as f64 / n as f64,
        median_max_drawdown: percentile(&drawdowns, 0.5),
    })
}

/// Nearest-rank percentile of already sorted data
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Largest peak-to-trough decline of a value path, in percent
fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd: f64 = 0.0;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak * 100.0);
        }
    }
    max_dd
}
