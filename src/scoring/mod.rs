pub mod allocation;
pub mod policy;

pub use allocation::{allocate, rank, Allocation, DEFAULT_MIN_FRACTION};
pub use policy::{score, undervalue, ScoreRecord, ScoringPolicy};
