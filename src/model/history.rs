use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::sample::Sample;

pub const DAYS_PER_YEAR: f64 = 365.25;

/// Trailing window (days) used for the annual dividend on a payout day.
const PAYOUT_DAY_WINDOW_DAYS: i64 = 360;
/// Trailing window (days) on days without a payout.
const QUIET_DAY_WINDOW_DAYS: i64 = 370;
/// Spacing, in snapshots, of the price changes sampled for growth uncertainty.
const GROWTH_STEP_SNAPSHOTS: usize = 20;

/// The state of an instrument on a single trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    /// Cost of one unit on this day.
    pub price: f64,
    /// Cash distribution paid on this day.
    #[serde(default)]
    pub dividend: f64,
    /// Total distributions over the trailing year.
    #[serde(default)]
    pub annual_dividend: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

/// Samples ready for the trend fit plus the figures the scorer needs.
#[derive(Debug, Clone, Default)]
pub struct FitWindow {
    pub samples: Vec<Sample>,
    /// Distributions accumulated from the window start up to the latest sample.
    pub cash: f64,
    /// Price of the latest usable snapshot.
    pub latest_price: f64,
}

/// Price growth over a lookback window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthEstimate {
    pub apr_percent: f64,
    pub uncertainty_percent: Option<f64>,
}

impl PriceHistory {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: String::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.symbol
        } else {
            &self.name
        }
    }

    /// Append a snapshot unless an identical one is already recorded.
    pub fn push(&mut self, snapshot: Snapshot) {
        if !self.snapshots.contains(&snapshot) {
            self.snapshots.push(snapshot);
        }
    }

    pub fn sort_by_date(&mut self) {
        self.snapshots.sort_by_key(|s| s.date);
    }

    /// Order snapshots by date and rebuild the derived annual dividends.
    /// Every history must pass through here before it is fitted.
    pub fn normalize(&mut self) {
        self.sort_by_date();
        self.recompute_annual_dividends();
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.latest().map(|s| s.date)
    }

    /// Index of the first snapshot less than `years` old as of `today`.
    fn window_start(&self, today: NaiveDate, years: f64) -> usize {
        let max_age_days = DAYS_PER_YEAR * years;
        self.snapshots
            .iter()
            .position(|s| ((today - s.date).num_days() as f64) < max_age_days)
            .unwrap_or(self.snapshots.len())
    }

    /// Build fit samples over the last `years`.
    ///
    /// `t` is measured in years relative to `today` (past samples are
    /// negative) and `y` is the price plus every distribution paid since the
    /// window start, so the series tracks total return. Snapshots with an
    /// unusable price still contribute their distribution to the running
    /// total.
    pub fn fit_window(&self, today: NaiveDate, years: f64) -> FitWindow {
        let mut window = FitWindow::default();
        let start = self.window_start(today, years);
        for snapshot in &self.snapshots[start..] {
            if snapshot.dividend.is_finite() {
                window.cash += snapshot.dividend;
            }
            if !snapshot.price.is_finite() || snapshot.price <= 0.0 {
                continue;
            }
            let t = (snapshot.date - today).num_days() as f64 / DAYS_PER_YEAR;
            window.samples.push(Sample::new(t, snapshot.price + window.cash));
            window.latest_price = snapshot.price;
        }
        window
    }

    /// Recompute every snapshot's `annual_dividend` from the daily payouts.
    pub fn recompute_annual_dividends(&mut self) {
        let mut trailing: VecDeque<(NaiveDate, f64)> = VecDeque::new();
        for snapshot in &mut self.snapshots {
            trailing.push_back((snapshot.date, snapshot.dividend));
            let window_days = if snapshot.dividend != 0.0 {
                PAYOUT_DAY_WINDOW_DAYS
            } else {
                QUIET_DAY_WINDOW_DAYS
            };
            while let Some(&(oldest, _)) = trailing.front() {
                if (snapshot.date - oldest).num_days() > window_days {
                    trailing.pop_front();
                } else {
                    break;
                }
            }
            snapshot.annual_dividend = trailing.iter().map(|(_, d)| d).sum();
        }
    }

    /// Snapshots no older than `years` as of `today`, newest first.
    fn recent(&self, today: NaiveDate, years: f64) -> impl Iterator<Item = &Snapshot> + '_ {
        let max_age_days = 365.0 * years;
        self.snapshots
            .iter()
            .rev()
            .take_while(move |s| ((today - s.date).num_days() as f64) <= max_age_days)
    }

    /// Average trailing dividend yield, in percent, over the last `years`.
    pub fn average_dividend_percent(&self, today: NaiveDate, years: f64) -> f64 {
        let mut n_samples = 0usize;
        let mut yield_sum = 0.0;
        for snapshot in self.recent(today, years) {
            n_samples += 1;
            let ratio = snapshot.annual_dividend / snapshot.price;
            if ratio.is_finite() {
                yield_sum += ratio;
            }
        }
        if n_samples == 0 {
            return 0.0;
        }
        let avg = 100.0 * yield_sum / n_samples as f64;
        if avg.is_finite() {
            avg
        } else {
            0.0
        }
    }

    /// Sample standard deviation of the trailing dividend yield, in percent.
    /// Falls back to the average itself when fewer than two samples exist.
    pub fn dividend_percent_uncertainty(&self, today: NaiveDate, years: f64) -> f64 {
        let average = self.average_dividend_percent(today, years);
        let mut n_samples = 0usize;
        let mut sum_sq = 0.0;
        for snapshot in self.recent(today, years) {
            n_samples += 1;
            let ratio = snapshot.annual_dividend / snapshot.price;
            if ratio.is_finite() {
                sum_sq += (100.0 * ratio - average).powi(2);
            }
        }
        if n_samples < 2 {
            return average;
        }
        let uncertainty = (sum_sq / (n_samples as f64 - 1.0)).sqrt();
        if uncertainty.is_finite() {
            uncertainty
        } else {
            average
        }
    }

    /// Compound annual growth of the price, in percent, from the first
    /// snapshot inside the window to the latest snapshot.
    pub fn growth_apr_percent(&self, today: NaiveDate, years: f64) -> f64 {
        let Some(last) = self.latest() else {
            return 0.0;
        };
        let max_age_days = DAYS_PER_YEAR * years;
        let past = self.snapshots[..self.snapshots.len() - 1]
            .iter()
            .find(|s| ((today - s.date).num_days() as f64) < max_age_days)
            .unwrap_or(last);
        if past.price == 0.0 {
            return 0.0;
        }
        let n_years = (last.date - past.date).num_days() as f64 / DAYS_PER_YEAR;
        if n_years == 0.0 {
            return 0.0;
        }
        100.0 * (last.price / past.price).powf(1.0 / n_years) - 100.0
    }

    /// Growth APR together with its uncertainty, both in percent.
    ///
    /// The uncertainty compares the daily-equivalent price change over each
    /// run of `GROWTH_STEP_SNAPSHOTS` snapshots against the daily rate implied
    /// by the APR, then scales the spread back to a year. It is `None` when
    /// fewer than two changes can be sampled.
    pub fn growth_apr_with_uncertainty(&self, today: NaiveDate, years: f64) -> GrowthEstimate {
        let apr = self.growth_apr_percent(today, years) / 100.0;
        let average_daily = (1.0 + apr).powf(1.0 / 365.0) - 1.0;

        let mut n_changes = 0usize;
        let mut sum_sq = 0.0;
        let mut i = self.window_start(today, years) + GROWTH_STEP_SNAPSHOTS;
        while i < self.snapshots.len() {
            let previous = self.snapshots[i - GROWTH_STEP_SNAPSHOTS].price;
            let change = (self.snapshots[i].price - previous) / previous;
            let daily = (1.0 + change).powf(1.0 / GROWTH_STEP_SNAPSHOTS as f64);
            if daily.is_finite() {
                sum_sq += (daily - (1.0 + average_daily)).powi(2);
                n_changes += 1;
            }
            i += GROWTH_STEP_SNAPSHOTS;
        }

        let uncertainty = if n_changes < 2 {
            None
        } else {
            let spread = (sum_sq / (n_changes as f64 - 1.0)).sqrt();
            Some(100.0 * spread * DAYS_PER_YEAR * (1.0 + apr)).filter(|u| u.is_finite())
        };
        GrowthEstimate {
            apr_percent: 100.0 * apr,
            uncertainty_percent: uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn snap(date: NaiveDate, price: f64, dividend: f64) -> Snapshot {
        Snapshot {
            date,
            price,
            dividend,
            annual_dividend: 0.0,
        }
    }

    #[test]
    fn push_skips_exact_duplicates() {
        let mut h = PriceHistory::new("CM");
        h.push(snap(day(2024, 1, 2), 10.0, 0.0));
        h.push(snap(day(2024, 1, 2), 10.0, 0.0));
        h.push(snap(day(2024, 1, 3), 11.0, 0.0));
        assert_eq!(h.snapshots.len(), 2);
        assert_eq!(h.display_name(), "CM");
    }

    #[test]
    fn fit_window_accumulates_dividends_into_values() {
        let mut h = PriceHistory::new("BCE");
        h.push(snap(day(2010, 1, 1), 50.0, 5.0));
        h.push(snap(day(2024, 1, 1), 40.0, 0.0));
        h.push(snap(day(2024, 7, 1), 41.0, 1.0));
        h.push(snap(day(2025, 1, 1), 42.0, 0.5));

        let w = h.fit_window(day(2025, 1, 1), 2.0);
        assert_eq!(w.samples.len(), 3);
        assert!((w.samples[0].y - 40.0).abs() < 1e-12);
        assert!((w.samples[1].y - 42.0).abs() < 1e-12);
        assert!((w.samples[2].y - 43.5).abs() < 1e-12);
        assert!(w.samples[2].t.abs() < 1e-12);
        assert!((w.samples[0].t + 366.0 / DAYS_PER_YEAR).abs() < 1e-12);
        assert!((w.cash - 1.5).abs() < 1e-12);
        assert!((w.latest_price - 42.0).abs() < 1e-12);
    }

    #[test]
    fn fit_window_skips_zero_prices_but_keeps_their_cash() {
        let mut h = PriceHistory::new("X");
        h.push(snap(day(2024, 12, 1), 10.0, 0.0));
        h.push(snap(day(2024, 12, 2), 0.0, 2.0));
        h.push(snap(day(2024, 12, 3), 10.0, 0.0));
        let w = h.fit_window(day(2024, 12, 3), 1.0);
        assert_eq!(w.samples.len(), 2);
        assert!((w.samples[1].y - 12.0).abs() < 1e-12);
    }

    #[test]
    fn annual_dividend_uses_trailing_window() {
        let mut h = PriceHistory::new("EPD");
        h.push(snap(day(2023, 1, 1), 20.0, 1.0));
        h.push(snap(day(2023, 6, 1), 20.0, 1.0));
        h.push(snap(day(2023, 12, 20), 20.0, 0.0));
        h.push(snap(day(2024, 1, 10), 20.0, 1.0));
        h.recompute_annual_dividends();

        assert!((h.snapshots[0].annual_dividend - 1.0).abs() < 1e-12);
        assert!((h.snapshots[1].annual_dividend - 2.0).abs() < 1e-12);
        // 353 days after the first payout: still inside the quiet-day window.
        assert!((h.snapshots[2].annual_dividend - 2.0).abs() < 1e-12);
        // 374 days after the first payout: it has rolled off.
        assert!((h.snapshots[3].annual_dividend - 2.0).abs() < 1e-12);
    }

    #[test]
    fn dividend_statistics_over_recent_window() {
        let mut h = PriceHistory::new("BNS");
        for (i, annual) in [2.0, 4.0].into_iter().enumerate() {
            h.snapshots.push(Snapshot {
                date: day(2024, 1, 1 + i as u32),
                price: 100.0,
                dividend: 0.0,
                annual_dividend: annual,
            });
        }
        let today = day(2024, 1, 2);
        assert!((h.average_dividend_percent(today, 1.0) - 3.0).abs() < 1e-12);
        let expected = 2f64.sqrt();
        assert!((h.dividend_percent_uncertainty(today, 1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn growth_apr_over_two_years() {
        let mut h = PriceHistory::new("PRU");
        h.push(snap(day(2020, 1, 1), 100.0, 0.0));
        h.push(snap(day(2022, 1, 1), 121.0, 0.0));
        let apr = h.growth_apr_percent(day(2022, 1, 1), 10.0);
        // 731 days is a hair over two years of 365.25 days.
        assert!((apr - 10.0).abs() < 0.01);
    }

    #[test]
    fn normalize_orders_snapshots_and_rebuilds_dividends() {
        let mut h = PriceHistory::new("CM");
        h.snapshots.push(Snapshot {
            date: day(2024, 2, 1),
            price: 45.0,
            dividend: 0.5,
            annual_dividend: 99.0,
        });
        h.snapshots.push(snap(day(2024, 1, 1), 44.0, 0.25));
        h.normalize();
        assert_eq!(h.snapshots[0].date, day(2024, 1, 1));
        assert!((h.snapshots[0].annual_dividend - 0.25).abs() < 1e-12);
        assert!((h.snapshots[1].annual_dividend - 0.75).abs() < 1e-12);
    }

    #[test]
    fn steady_growth_has_small_uncertainty() {
        let mut h = PriceHistory::new("AMZN");
        let start = day(2020, 1, 1);
        let daily = 1.1f64.powf(1.0 / DAYS_PER_YEAR);
        for i in 0..=1461 {
            h.push(snap(start + chrono::Duration::days(i), 100.0 * daily.powi(i as i32), 0.0));
        }
        let today = day(2024, 1, 1);
        let growth = h.growth_apr_with_uncertainty(today, 3.0);
        assert!((growth.apr_percent - 10.0).abs() < 0.01);
        let uncertainty = growth.uncertainty_percent.expect("enough samples");
        assert!(uncertainty >= 0.0);
        assert!(uncertainty < 0.1);
    }

    #[test]
    fn noisy_growth_has_larger_uncertainty() {
        let today = day(2024, 1, 1);
        let build = |wiggle: f64| {
            let mut h = PriceHistory::new("GDDY");
            for i in 0..=730 {
                let swing = if (i / 20) % 2 == 0 { 1.0 + wiggle } else { 1.0 - wiggle };
                h.push(snap(today - chrono::Duration::days(730 - i), 50.0 * swing, 0.0));
            }
            h.growth_apr_with_uncertainty(today, 1.5)
        };
        let calm = build(0.001).uncertainty_percent.expect("enough samples");
        let noisy = build(0.05).uncertainty_percent.expect("enough samples");
        assert!(noisy > calm);
    }

    #[test]
    fn growth_uncertainty_needs_two_changes() {
        let mut h = PriceHistory::new("PRU");
        h.push(snap(day(2020, 1, 1), 100.0, 0.0));
        h.push(snap(day(2022, 1, 1), 121.0, 0.0));
        let growth = h.growth_apr_with_uncertainty(day(2022, 1, 1), 10.0);
        assert!((growth.apr_percent - 10.0).abs() < 0.01);
        assert_eq!(growth.uncertainty_percent, None);
    }

    #[test]
    fn empty_history_has_neutral_statistics() {
        let h = PriceHistory::new("NONE");
        let today = day(2024, 1, 1);
        assert_eq!(h.growth_apr_percent(today, 5.0), 0.0);
        assert_eq!(h.average_dividend_percent(today, 5.0), 0.0);
        assert!(h.fit_window(today, 5.0).samples.is_empty());
    }
}
