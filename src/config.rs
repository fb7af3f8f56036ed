use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::scoring::{ScoringPolicy, DEFAULT_MIN_FRACTION};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ranking: RankingConfig,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Symbols in the preferred category; their positive scores are boosted.
    #[serde(default)]
    pub preferred: Vec<String>,
    /// How many years of history feed each trend fit.
    pub lookback_years: f64,
    #[serde(default = "default_min_allocation_fraction")]
    pub min_allocation_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding `<SYMBOL>.json` price histories.
    pub dir: PathBuf,
    #[serde(default)]
    pub download_policy: DownloadPolicy,
    /// Cached histories whose latest snapshot is older than this are stale.
    pub max_age_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// When to ask the remote source for fresh history instead of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPolicy {
    Always,
    Never,
    #[default]
    IfStale,
}

fn default_min_allocation_fraction() -> f64 {
    DEFAULT_MIN_FRACTION
}

fn normalize_symbol(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

impl RankingConfig {
    /// Configured symbols, normalized and deduplicated, minus exclusions.
    pub fn universe(&self) -> Vec<String> {
        let excluded: Vec<String> = self.excluded.iter().map(|s| normalize_symbol(s)).collect();
        let mut out: Vec<String> = Vec::new();
        for sym in &self.symbols {
            let s = normalize_symbol(sym);
            if !s.is_empty() && !out.contains(&s) && !excluded.contains(&s) {
                out.push(s);
            }
        }
        out
    }

    pub fn is_preferred(&self, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        self.preferred.iter().any(|p| normalize_symbol(p) == symbol)
    }
}

impl Config {
    /// Load from `TREND_RANK_CONFIG` (or `config/default.toml`), reading `.env` first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = std::env::var("TREND_RANK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to load {}", path.display()))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ranking.universe().is_empty() {
            bail!("ranking.symbols is empty after exclusions");
        }
        let years = self.ranking.lookback_years;
        if !years.is_finite() || years <= 0.0 {
            bail!("ranking.lookback_years must be > 0, got {}", years);
        }
        let cutoff = self.ranking.min_allocation_fraction;
        if !(0.0..1.0).contains(&cutoff) {
            bail!(
                "ranking.min_allocation_fraction must be in [0, 1), got {}",
                cutoff
            );
        }
        if !(self.scoring.confidence_k > 0.0) {
            bail!(
                "scoring.confidence_k must be > 0, got {}",
                self.scoring.confidence_k
            );
        }
        if !(self.scoring.damping_divisor > 0.0) {
            bail!(
                "scoring.damping_divisor must be > 0, got {}",
                self.scoring.damping_divisor
            );
        }
        if !(self.scoring.preferred_boost > 0.0) {
            bail!(
                "scoring.preferred_boost must be > 0, got {}",
                self.scoring.preferred_boost
            );
        }
        if self.history.max_age_days < 0 {
            bail!(
                "history.max_age_days must be >= 0, got {}",
                self.history.max_age_days
            );
        }
        Ok(())
    }
}
