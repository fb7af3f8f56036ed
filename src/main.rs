use std::path::PathBuf;

use anyhow::Result;

use trend_rank::config::Config;
use trend_rank::ranking::{rank_universe, RankingReport};
use trend_rank::source::{JsonHistoryStore, OfflineFetcher};

fn main() -> Result<()> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::load_from_path(&path),
        None => Config::load(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Pass a config path or set TREND_RANK_CONFIG (default: config/default.toml)");
            std::process::exit(1);
        }
    };

    // Log to file so the report on stdout stays readable
    let log_file = std::fs::File::create("trend-rank.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
            }),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .json()
        .init();

    let today = chrono::Local::now().date_naive();
    tracing::info!(
        symbols = config.ranking.universe().len(),
        history_dir = %config.history.dir.display(),
        policy = ?config.history.download_policy,
        %today,
        "Starting trend-rank"
    );

    let store = JsonHistoryStore::new(&config.history.dir);
    let report = rank_universe(&config, &store, &OfflineFetcher, today);
    print_report(&report);
    Ok(())
}

fn print_report(report: &RankingReport) {
    println!(
        "{:<8} {:<28} {:>8} {:>9} {:>11} {:>12} {:>8}",
        "SYMBOL", "NAME", "SCORE", "RATE %", "UNDERVAL %", "UNCERTAIN %", "DIV %"
    );
    for record in &report.ranked {
        let (name, div) = report
            .details
            .get(&record.symbol)
            .map(|d| (d.name.as_str(), d.dividend_percent))
            .unwrap_or(("", 0.0));
        println!(
            "{:<8} {:<28} {:>8.2} {:>9.2} {:>11.2} {:>12.2} {:>8.2}",
            record.symbol,
            truncate(name, 28),
            record.score,
            100.0 * record.rate,
            record.undervalue_percent,
            record.uncertainty_percent,
            div
        );
    }

    println!();
    println!(
        "{:<8} {:>7} {:>9} {:>16} {:>18}",
        "SYMBOL", "SAMPLES", "T0 YRS", "DIV % +/-", "GROWTH % +/-"
    );
    for record in &report.ranked {
        let Some(d) = report.details.get(&record.symbol) else {
            continue;
        };
        let growth_uncertainty = d
            .growth_uncertainty_percent
            .map(|u| format!("{:.2}", u))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:>7} {:>9.2} {:>16} {:>18}",
            record.symbol,
            d.samples,
            d.trend.t0(),
            format!("{:.2} +/- {:.2}", d.dividend_percent, d.dividend_uncertainty_percent),
            format!("{:.2} +/- {}", d.growth_apr_percent, growth_uncertainty)
        );
    }

    println!();
    if report.allocations.is_empty() {
        println!("No instrument qualifies for allocation.");
    } else {
        println!("{:<8} {:>8}", "SYMBOL", "ALLOC %");
        for a in &report.allocations {
            println!("{:<8} {:>8.1}", a.symbol, a.percent);
        }
    }

    if !report.skipped.is_empty() {
        println!();
        for s in &report.skipped {
            println!("skipped {}: {}", s.symbol, s.reason);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(['~']).collect()
    }
}
