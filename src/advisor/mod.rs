pub mod types;
pub mod rules;
