use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::config::{DownloadPolicy, HistoryConfig};
use crate::error::TrendError;
use crate::model::history::PriceHistory;

/// Local (cached) price histories.
pub trait HistoryReader {
    fn load_history(&self, symbol: &str) -> Result<Option<PriceHistory>>;
}

/// Persists histories so later runs can reuse them.
pub trait HistoryWriter {
    fn save_history(&self, history: &PriceHistory) -> Result<()>;
}

/// Remote source of fresh price histories.
pub trait HistoryFetcher {
    fn fetch_history(&self, symbol: &str) -> Result<Option<PriceHistory>>;
}

/// Fetcher for runs without a remote market-data source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl HistoryFetcher for OfflineFetcher {
    fn fetch_history(&self, symbol: &str) -> Result<Option<PriceHistory>> {
        tracing::debug!(symbol = %symbol, "No remote history source configured");
        Ok(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    UseCached,
    Fetch,
}

/// Decide where a symbol's history comes from, before any fitting happens.
pub fn resolve_acquisition(
    policy: DownloadPolicy,
    cached_last_date: Option<NaiveDate>,
    today: NaiveDate,
    max_age_days: i64,
) -> Acquisition {
    match policy {
        DownloadPolicy::Always => Acquisition::Fetch,
        DownloadPolicy::Never => Acquisition::UseCached,
        DownloadPolicy::IfStale => match cached_last_date {
            Some(last) if (today - last).num_days() <= max_age_days => Acquisition::UseCached,
            _ => Acquisition::Fetch,
        },
    }
}

/// Load a symbol's history following the configured download policy.
///
/// Fetched histories are normalized and written back to `cache`; a failed
/// write is logged and the fresh history is still used. A fetch that yields
/// nothing falls back to whatever the cache holds.
pub fn acquire_history<C, F>(
    cache: &C,
    fetcher: &F,
    cfg: &HistoryConfig,
    symbol: &str,
    today: NaiveDate,
) -> Result<Option<PriceHistory>>
where
    C: HistoryReader + HistoryWriter + ?Sized,
    F: HistoryFetcher + ?Sized,
{
    let cached = cache.load_history(symbol)?;
    let decision = resolve_acquisition(
        cfg.download_policy,
        cached.as_ref().and_then(PriceHistory::last_date),
        today,
        cfg.max_age_days,
    );
    match decision {
        Acquisition::UseCached => Ok(cached),
        Acquisition::Fetch => match fetcher.fetch_history(symbol)? {
            Some(mut fresh) => {
                fresh.normalize();
                if let Err(e) = cache.save_history(&fresh) {
                    let reason = format!("{:#}", e);
                    tracing::warn!(symbol = %symbol, error = %reason, "Failed to cache fetched history");
                }
                Ok(Some(fresh))
            }
            None => {
                if cached.is_some() {
                    tracing::warn!(symbol = %symbol, "Fresh history unavailable, using cached copy");
                }
                Ok(cached)
            }
        },
    }
}

/// Directory of `<SYMBOL>.json` price histories.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.json", symbol))
    }

    pub fn save(&self, history: &PriceHistory) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path_for(&history.symbol);
        let payload = serde_json::to_string_pretty(history)
            .context("failed to serialize price history")?;
        std::fs::write(&path, payload)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(symbol = %history.symbol, path = %path.display(), "Price history saved");
        Ok(())
    }
}

impl HistoryWriter for JsonHistoryStore {
    fn save_history(&self, history: &PriceHistory) -> Result<()> {
        self.save(history)
    }
}

impl HistoryReader for JsonHistoryStore {
    fn load_history(&self, symbol: &str) -> Result<Option<PriceHistory>> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let history = read_history_file(&path)
            .with_context(|| format!("failed to load history from {}", path.display()))?;
        tracing::debug!(
            symbol = %symbol,
            snapshots = history.snapshots.len(),
            "Parsed history from local drive"
        );
        Ok(Some(history))
    }
}

pub fn read_history_file(path: &Path) -> Result<PriceHistory, TrendError> {
    let payload = std::fs::read_to_string(path)?;
    parse_history(&payload)
}

/// Parse a JSON price history, order it by date and derive the trailing
/// annual dividends from the daily payouts.
pub fn parse_history(payload: &str) -> Result<PriceHistory, TrendError> {
    let mut history: PriceHistory = serde_json::from_str(payload)?;
    if history.symbol.trim().is_empty() {
        return Err(TrendError::InvalidInput(
            "price history has an empty symbol".to_string(),
        ));
    }
    history.normalize();
    Ok(history)
}
