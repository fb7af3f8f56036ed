use serde::Deserialize;

use crate::fit::FittedTrend;

/// Constants that turn a fitted trend into a comparable ranking score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Confidence multiplier `K` applied to the fit's relative stdev.
    pub confidence_k: f64,
    /// Divisor `D` that damps the undervaluation term against the raw rate.
    pub damping_divisor: f64,
    /// Multiplier for positive scores of instruments in the preferred category.
    pub preferred_boost: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            confidence_k: 2.0,
            damping_divisor: 8.0,
            preferred_boost: 1.25,
        }
    }
}

/// Per-instrument scoring result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub symbol: String,
    pub score: f64,
    pub rate: f64,
    pub undervalue_percent: f64,
    pub uncertainty_percent: f64,
}

/// Fractional gap between the trend's projection for now and the observed
/// total (price plus distributions). Positive means the instrument trades
/// below its trend.
pub fn undervalue(trend: &FittedTrend, current_value: f64, cash_since_origin: f64) -> f64 {
    let observed = current_value + cash_since_origin;
    (trend.projected_now() - observed) / observed
}

/// Score with the default policy constants.
pub fn score(trend: &FittedTrend, current_value: f64, cash_since_origin: f64) -> f64 {
    ScoringPolicy::default().score(trend, current_value, cash_since_origin)
}

impl ScoringPolicy {
    /// `K * stdev`, the discount applied for fit uncertainty.
    pub fn uncertainty(&self, trend: &FittedTrend) -> f64 {
        self.confidence_k * trend.stdev()
    }

    /// Risk-discounted expected return, in percent-like units.
    ///
    /// Zero once `K * stdev >= 1`; otherwise
    /// `100 * (rate + undervalue / D) * (1 - K * stdev) - K * stdev`.
    pub fn score(&self, trend: &FittedTrend, current_value: f64, cash_since_origin: f64) -> f64 {
        let uncertainty = self.uncertainty(trend);
        if uncertainty >= 1.0 {
            return 0.0;
        }
        let gap = undervalue(trend, current_value, cash_since_origin);
        100.0 * (trend.rate() + gap / self.damping_divisor) * (1.0 - uncertainty) - uncertainty
    }

    /// Apply the preferred-category boost. Only positive scores are boosted.
    pub fn boosted(&self, score: f64, preferred: bool) -> f64 {
        if preferred && score > 0.0 {
            score * self.preferred_boost
        } else {
            score
        }
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        trend: &FittedTrend,
        current_value: f64,
        cash_since_origin: f64,
        preferred: bool,
    ) -> ScoreRecord {
        let raw = self.score(trend, current_value, cash_since_origin);
        ScoreRecord {
            symbol: symbol.to_string(),
            score: self.boosted(raw, preferred),
            rate: trend.rate(),
            undervalue_percent: 100.0 * undervalue(trend, current_value, cash_since_origin),
            uncertainty_percent: 100.0 * self.uncertainty(trend),
        }
    }
}
