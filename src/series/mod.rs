pub mod types;
pub mod aligner;
pub mod comparison;
