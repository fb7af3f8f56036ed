use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::config::Config;
use crate::fit::{fit, FittedTrend};
use crate::scoring::{allocate, rank, Allocation, ScoreRecord};
use crate::source::{acquire_history, HistoryFetcher, HistoryReader, HistoryWriter};

/// Context shown next to a ranked instrument.
#[derive(Debug, Clone)]
pub struct InstrumentDetail {
    pub name: String,
    pub trend: FittedTrend,
    pub samples: usize,
    pub dividend_percent: f64,
    pub dividend_uncertainty_percent: f64,
    pub growth_apr_percent: f64,
    pub growth_uncertainty_percent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RankingReport {
    /// Scored instruments, best first.
    pub ranked: Vec<ScoreRecord>,
    pub allocations: Vec<Allocation>,
    pub details: BTreeMap<String, InstrumentDetail>,
    pub skipped: Vec<SkippedInstrument>,
}

/// Fit, score and allocate every symbol in the configured universe.
///
/// Instruments without history, with a failed fit or with a non-finite score
/// are skipped and reported; they never abort the run. Fetched histories are
/// written back to `cache`.
pub fn rank_universe<C, F>(config: &Config, cache: &C, fetcher: &F, today: NaiveDate) -> RankingReport
where
    C: HistoryReader + HistoryWriter + ?Sized,
    F: HistoryFetcher + ?Sized,
{
    let mut report = RankingReport::default();
    let mut records = Vec::new();

    for symbol in config.ranking.universe() {
        match score_instrument(config, cache, fetcher, &symbol, today) {
            Ok((record, _)) if !record.score.is_finite() => {
                tracing::warn!(symbol = %symbol, score = record.score, "Dropping non-finite score");
                report.skipped.push(SkippedInstrument {
                    symbol,
                    reason: format!("non-finite score {}", record.score),
                });
            }
            Ok((record, detail)) => {
                tracing::info!(
                    symbol = %symbol,
                    score = record.score,
                    rate = record.rate,
                    undervalue_pct = record.undervalue_percent,
                    uncertainty_pct = record.uncertainty_percent,
                    "Instrument scored"
                );
                report.details.insert(symbol, detail);
                records.push(record);
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::warn!(symbol = %symbol, error = %reason, "Skipping instrument");
                report.skipped.push(SkippedInstrument { symbol, reason });
            }
        }
    }

    report.ranked = rank(records);
    report.allocations = allocate(&report.ranked, config.ranking.min_allocation_fraction);
    tracing::info!(
        scored = report.ranked.len(),
        allocated = report.allocations.len(),
        skipped = report.skipped.len(),
        "Ranking complete"
    );
    report
}

fn score_instrument<C, F>(
    config: &Config,
    cache: &C,
    fetcher: &F,
    symbol: &str,
    today: NaiveDate,
) -> Result<(ScoreRecord, InstrumentDetail)>
where
    C: HistoryReader + HistoryWriter + ?Sized,
    F: HistoryFetcher + ?Sized,
{
    let years = config.ranking.lookback_years;
    let history = acquire_history(cache, fetcher, &config.history, symbol, today)?
        .ok_or_else(|| anyhow!("no price history available"))?;

    let window = history.fit_window(today, years);
    let trend = fit(&window.samples)
        .with_context(|| format!("trend fit over {} samples failed", window.samples.len()))?;

    let record = config.scoring.evaluate(
        symbol,
        &trend,
        window.latest_price,
        window.cash,
        config.ranking.is_preferred(symbol),
    );
    let growth = history.growth_apr_with_uncertainty(today, years);
    let detail = InstrumentDetail {
        name: history.display_name().to_string(),
        trend,
        samples: window.samples.len(),
        dividend_percent: history.average_dividend_percent(today, years),
        dividend_uncertainty_percent: history.dividend_percent_uncertainty(today, years),
        growth_apr_percent: growth.apr_percent,
        growth_uncertainty_percent: growth.uncertainty_percent,
    };
    Ok((record, detail))
}
