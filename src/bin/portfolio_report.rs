use tracing::{error, info, warn};

use portfolio_analysis_engine::advisor::rules;
use portfolio_analysis_engine::analytics_client::client::AnalyticsClient;
use portfolio_analysis_engine::config;
use portfolio_analysis_engine::logging;
use portfolio_analysis_engine::positions::converter;
use portfolio_analysis_engine::positions::types::{self, Position};
use portfolio_analysis_engine::simulation::reshaper;
use portfolio_analysis_engine::strategy::aggregator::StrategyComparisonLoader;
use portfolio_analysis_engine::strategy::types::StrategyMethod;

const DEFAULT_PORTFOLIO_VALUE: f64 = 10_000.0;
const MONTE_CARLO_SIMULATIONS: usize = 1_000;
const MONTE_CARLO_HORIZON_DAYS: usize = 252;
const VAR_CONFIDENCE_LEVEL: f64 = 0.95;
const VAR_HORIZON_DAYS: usize = 1;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Err(e) = logging::init_logging(env!("CARGO_BIN_NAME").to_string()) {
        eprintln!("Failed to initialize logging: {}", e);
        return Err(e);
    }

    let mut args = std::env::args().skip(1);
    let portfolio_id = args
        .next()
        .ok_or_else(|| eyre::eyre!("Usage: portfolio_report <portfolio_id> [portfolio_value]"))?;
    let portfolio_value = match args.next() {
        Some(raw) => raw.parse::<f64>()?,
        None => DEFAULT_PORTFOLIO_VALUE,
    };

    let cfg = config::Config::load()?;
    info!(api = %cfg.analytics_api_url, batch_timeout = ?cfg.strategy_batch_timeout, "Configuration loaded and logging initialized");

    let client = AnalyticsClient::new(&cfg)?;
    let loader = StrategyComparisonLoader::new(client, cfg.strategy_batch_timeout);

    // Strategy comparison and recommendation
    let comparison = loader.load(&portfolio_id).await?;
    comparison.log_comparison();
    match rules::advise_comparison(&comparison, &cfg.advisor_thresholds) {
        Ok(recommendation) => info!(
            verdict = recommendation.verdict.as_str(),
            detail = %serde_json::to_string(&recommendation.verdict)?,
            "{}", recommendation.message
        ),
        Err(e) => warn!("{}", e),
    }

    let client = loader.evaluator();

    // Optimized weights as whole shares at live prices
    if let Some(optimized) = comparison.get(StrategyMethod::MeanVariance) {
        let targets: Vec<Position> = optimized
            .weights
            .iter()
            .map(|(symbol, weight)| Position::with_weight(symbol.clone(), *weight))
            .collect();
        if let Err(e) = types::validate_weights(&targets) {
            warn!("Optimized weights: {}", e);
        }
        let symbols: Vec<String> = targets.iter().map(|p| p.symbol().to_string()).collect();
        match client.live_prices(&symbols).await {
            Ok(snapshot) => {
                let weights = types::weight_map(&targets);
                let conversion = converter::weights_to_shares(&weights, portfolio_value, &snapshot.prices);
                let book: Vec<Position> = conversion
                    .shares
                    .iter()
                    .map(|(symbol, count)| Position::with_shares(symbol.clone(), *count))
                    .collect();
                let invested = converter::portfolio_value(&types::share_map(&book), &snapshot.prices).unwrap_or(0.0);
                info!(
                    as_of = %snapshot.as_of,
                    shares = ?conversion.shares,
                    invested = invested,
                    cash_left = portfolio_value - invested,
                    "Optimized allocation in whole shares"
                );
                for missing in &conversion.missing {
                    warn!("{}", missing);
                }
            }
            Err(e) => error!(error = ?e, "Failed to fetch live prices"),
        }
    }

    match client.value_at_risk(&portfolio_id, VAR_CONFIDENCE_LEVEL, VAR_HORIZON_DAYS).await {
        Ok(var) => info!(
            var_percent = var.var_percent,
            var_value = var.var_value,
            cvar_percent = var.cvar_percent,
            cvar_value = var.cvar_value,
            historical_var = var.historical_var,
            parametric_var = var.parametric_var,
            "Value at risk ({}% / {}d)", VAR_CONFIDENCE_LEVEL * 100.0, VAR_HORIZON_DAYS
        ),
        Err(e) => error!(error = ?e, "Failed to fetch value at risk"),
    }

    // Monte-Carlo panel
    match client
        .monte_carlo(&portfolio_id, MONTE_CARLO_SIMULATIONS, MONTE_CARLO_HORIZON_DAYS, portfolio_value)
        .await
    {
        Ok(sim) => {
            let chart = reshaper::reshape_simulation(&sim);
            info!(rows = chart.rows.len(), paths = chart.path_count, "Monte-Carlo chart reshaped");
            if let Some(summary) = reshaper::summarize_simulation(&sim) {
                info!(
                    median_final = summary.median_final_value,
                    p5_final = summary.final_value_5th,
                    p95_final = summary.final_value_95th,
                    probability_of_loss = summary.probability_of_loss,
                    median_max_drawdown = summary.median_max_drawdown,
                    "Monte-Carlo summary"
                );
            }
        }
        Err(e) => error!(error = ?e, "Failed to fetch Monte-Carlo simulation"),
    }

    Ok(())
}
