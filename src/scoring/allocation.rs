use std::cmp::Ordering;

use crate::scoring::policy::ScoreRecord;

/// Smallest share of the running score sum a candidate must represent to be
/// included in the allocation.
pub const DEFAULT_MIN_FRACTION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub symbol: String,
    pub score: f64,
    /// Share of the portfolio, in percent. Included allocations sum to 100.
    pub percent: f64,
}

/// Drop non-finite scores and sort the rest by descending score. Equal scores
/// keep their input order. Callers that need to report dropped instruments
/// filter them out beforehand.
pub fn rank(mut records: Vec<ScoreRecord>) -> Vec<ScoreRecord> {
    records.retain(|r| r.score.is_finite());
    records.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    records
}

/// Walk `ranked` (descending scores) and split 100% across the material
/// candidates.
///
/// The walk stops at the first non-positive score, and at the first candidate
/// whose score would be less than `min_fraction` of the running sum including
/// itself.
pub fn allocate(ranked: &[ScoreRecord], min_fraction: f64) -> Vec<Allocation> {
    let mut running_sum = 0.0;
    let mut included: Vec<&ScoreRecord> = Vec::new();
    for record in ranked {
        if !record.score.is_finite() {
            continue;
        }
        if record.score <= 0.0 {
            break;
        }
        let total = running_sum + record.score;
        if record.score / total < min_fraction {
            break;
        }
        running_sum = total;
        included.push(record);
    }

    included
        .into_iter()
        .map(|r| Allocation {
            symbol: r.symbol.clone(),
            score: r.score,
            percent: 100.0 * r.score / running_sum,
        })
        .collect()
}
