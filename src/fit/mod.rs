pub mod origin;
pub mod trend;

pub use origin::{candidate_indices, ORIGIN_STEPS};
pub use trend::{evaluate, fit, CandidateFit, FittedTrend};
