use crate::error::TrendError;

/// One `(time, value)` observation fed to the trend fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Time in consistent units, e.g. years relative to today (negative = past).
    pub t: f64,
    /// Observed value. Must be finite and > 0.
    pub y: f64,
}

impl Sample {
    pub fn new(t: f64, y: f64) -> Self {
        Self { t, y }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((t, y): (f64, f64)) -> Self {
        Self { t, y }
    }
}

/// Build samples from parallel time/value slices.
pub fn samples_from_pairs(t: &[f64], y: &[f64]) -> Result<Vec<Sample>, TrendError> {
    if t.len() != y.len() {
        return Err(TrendError::InvalidInput(format!(
            "time and value lists differ in length ({} vs {})",
            t.len(),
            y.len()
        )));
    }
    Ok(t.iter().zip(y).map(|(&t, &y)| Sample { t, y }).collect())
}
