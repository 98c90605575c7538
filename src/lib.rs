pub mod config;
pub mod logging;
pub mod error;
pub mod series;
pub mod positions;
pub mod strategy;
pub mod advisor;
pub mod simulation;
pub mod analytics_client;
