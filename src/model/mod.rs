pub mod history;
pub mod sample;

pub use history::{FitWindow, GrowthEstimate, PriceHistory, Snapshot, DAYS_PER_YEAR};
pub use sample::{samples_from_pairs, Sample};
