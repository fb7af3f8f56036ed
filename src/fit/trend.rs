use crate::error::TrendError;
use crate::fit::origin::candidate_indices;
use crate::model::sample::Sample;

/// Stdev differences below this are treated as ties, so the earlier
/// candidate in scan order keeps winning over floating-point noise.
const TIE_TOLERANCE: f64 = 1e-12;

/// Exponential model `y = y0 * (1 + rate)^(t - t0)` fitted to a sample series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedTrend {
    rate: f64,
    t0: f64,
    y0: f64,
    stdev: f64,
}

impl FittedTrend {
    pub fn new(rate: f64, t0: f64, y0: f64, stdev: f64) -> Self {
        Self {
            rate,
            t0,
            y0,
            stdev,
        }
    }

    /// Fractional growth per unit of time (APR when `t` is in years).
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Origin time; always one of the fitted sample times.
    pub fn t0(&self) -> f64 {
        self.t0
    }

    /// Observed value at `t0`.
    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Relative standard deviation of the residuals `(model - y) / y`.
    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    pub fn value_at(&self, t: f64) -> f64 {
        self.y0 * (1.0 + self.rate).powf(t - self.t0)
    }

    /// Model value at `t = 0`, i.e. "now" when times are measured relative to today.
    pub fn projected_now(&self) -> f64 {
        self.value_at(0.0)
    }
}

/// Rate and residual spread for one candidate origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFit {
    pub rate: f64,
    pub stdev: f64,
}

/// Least-squares rate with the log-space intercept pinned at `(t0, ln y0)`.
///
/// `ln(1 + rate) = (sum dt*ln(y) - ln(y0)*sum dt) / sum dt^2` with
/// `dt = t - t0`. The spread is `sqrt(sum r^2 / (n - 1))` over the relative
/// residuals `r = (model - y) / y`.
///
/// Returns `None` when the origin cannot anchor a fit: fewer than two
/// samples, a non-positive `y0`, a zero denominator, or non-finite results.
pub fn evaluate(samples: &[Sample], t0: f64, y0: f64) -> Option<CandidateFit> {
    if samples.len() < 2 || !(y0 > 0.0) {
        return None;
    }

    let ln_y0 = y0.ln();
    let mut sum_dt_ln_y = 0.0;
    let mut sum_dt = 0.0;
    let mut sum_dt_sq = 0.0;
    for s in samples {
        let dt = s.t - t0;
        sum_dt_ln_y += dt * s.y.ln();
        sum_dt += dt;
        sum_dt_sq += dt * dt;
    }
    if !(sum_dt_sq > 0.0) {
        return None;
    }

    let ln_growth = (sum_dt_ln_y - ln_y0 * sum_dt) / sum_dt_sq;
    let rate = ln_growth.exp_m1();
    let growth = ln_growth.exp();

    let sum_rel_sq: f64 = samples
        .iter()
        .map(|s| {
            let model = y0 * growth.powf(s.t - t0);
            ((model - s.y) / s.y).powi(2)
        })
        .sum();
    let stdev = (sum_rel_sq / (samples.len() - 1) as f64).sqrt();

    (rate.is_finite() && stdev.is_finite()).then_some(CandidateFit { rate, stdev })
}

/// Fit an exponential trend to `samples` (ordered by increasing `t`).
///
/// Every candidate origin from [`candidate_indices`] is evaluated and the one
/// with the lowest residual spread wins; ties go to the candidate scanned
/// first.
pub fn fit(samples: &[Sample]) -> Result<FittedTrend, TrendError> {
    validate(samples)?;

    let mut best: Option<(usize, CandidateFit)> = None;
    for index in candidate_indices(samples.len()) {
        let origin = samples[index];
        let Some(candidate) = evaluate(samples, origin.t, origin.y) else {
            tracing::trace!(origin_index = index, "origin candidate unusable");
            continue;
        };
        match best {
            Some((_, current)) if candidate.stdev >= current.stdev - TIE_TOLERANCE => {}
            _ => best = Some((index, candidate)),
        }
    }

    let (index, winner) = best.ok_or_else(|| {
        TrendError::DegenerateFit(format!(
            "no origin candidate produced a finite fit over {} samples",
            samples.len()
        ))
    })?;
    let origin = samples[index];
    tracing::debug!(
        origin_index = index,
        t0 = origin.t,
        rate = winner.rate,
        stdev = winner.stdev,
        "exponential trend fitted"
    );
    Ok(FittedTrend::new(winner.rate, origin.t, origin.y, winner.stdev))
}

fn validate(samples: &[Sample]) -> Result<(), TrendError> {
    match samples.len() {
        0 => return Err(TrendError::InvalidInput("no samples".to_string())),
        1 => {
            return Err(TrendError::InvalidInput(
                "at least 2 samples are required, got 1".to_string(),
            ))
        }
        _ => {}
    }
    for (i, s) in samples.iter().enumerate() {
        if !s.t.is_finite() {
            return Err(TrendError::InvalidInput(format!(
                "sample {} has non-finite time {}",
                i, s.t
            )));
        }
        if !s.y.is_finite() || s.y <= 0.0 {
            return Err(TrendError::InvalidInput(format!(
                "sample {} has value {}; values must be finite and > 0",
                i, s.y
            )));
        }
    }
    let first_t = samples[0].t;
    if samples.iter().all(|s| s.t == first_t) {
        return Err(TrendError::InvalidInput(format!(
            "all {} samples share time {}",
            samples.len(),
            first_t
        )));
    }
    Ok(())
}
