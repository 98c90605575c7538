pub mod types;
pub mod converter;
pub mod planner;
