pub mod types;
pub mod aggregator;
pub mod generation;
pub mod strategy_constants;
