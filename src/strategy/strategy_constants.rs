// --- AGGREGATION CONSTANTS ---
/// Batch deadline used when the caller does not configure one
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 30;
/// Number of simultaneous evaluator timeouts that marks a comparison as degraded
pub const DEGRADED_TIMEOUT_COUNT: usize = 2;
