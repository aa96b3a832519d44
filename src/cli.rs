use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{AnalysisConfig, SourceConfig, SourceKind};
use crate::manager::Task;
use crate::market_data::YAHOO_BASE_URL;
use crate::models::Asset;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Asset to analyse (ETH-USD or BTC-USD)
    #[arg(short, long, global = true, default_value = "ETH-USD", value_parser = parse_asset)]
    pub asset: Asset,

    #[arg(long, global = true, value_enum, default_value_t = SourceKind::Yahoo)]
    pub source: SourceKind,

    /// Seed for the simulated source
    #[arg(long, global = true, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, global = true, default_value = YAHOO_BASE_URL)]
    pub base_url: String,

    #[arg(short, long, global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Auto-refresh interval, e.g. 30s, 1m, 1h
    #[arg(short, long, global = true, default_value = "60s", value_parser = parse_duration)]
    pub refresh: Duration,

    #[arg(long, global = true, default_value_t = 24)]
    pub horizon: usize,

    /// Skip writing chart images
    #[arg(long, global = true)]
    pub no_chart: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
    /// Compute SMA/EMA/RSI/Bollinger Bands and render the chart
    Chart,
    /// Run the Augmented Dickey-Fuller test on the close series
    Stationarity,
    /// Fit ARIMA(1,1,1), render the forecast and export it to CSV
    Forecast,
    /// Interactive mode with periodic auto-refresh
    Watch,
}

impl Args {
    pub fn config(&self) -> AnalysisConfig {
        AnalysisConfig {
            initial_asset: self.asset,
            horizon: self.horizon,
            refresh_interval: self.refresh,
            output_dir: self.output_dir.clone(),
            render_charts: !self.no_chart,
            source: SourceConfig {
                kind: self.source,
                base_url: self.base_url.clone(),
                seed: self.seed,
            },
            ..Default::default()
        }
    }
}

pub fn parse_asset(s: &str) -> Result<Asset, String> {
    Asset::from_str(s).map_err(|e| e.to_string())
}

/// Parses `30s`, `1m` or `1h` into a non-zero duration.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let (digits, unit) = if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60)
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3600)
    } else {
        return Err("Invalid duration format. Use formats like 1s, 3m, or 1h.".into());
    };

    let num = u64::from_str(digits).map_err(|e| e.to_string())?;
    let secs = num
        .checked_mul(unit)
        .ok_or_else(|| format!("Duration {s} is too large"))?;
    if secs == 0 {
        return Err("Duration must be greater than zero".into());
    }
    Ok(Duration::from_secs(secs))
}

/// Parses one interactive command. `Ok(None)` means quit.
pub fn parse_command(line: &str) -> Result<Option<Task>, String> {
    let mut words = line.split_whitespace();
    let task = match (words.next(), words.next()) {
        (Some("chart"), None) => Task::ShowChart,
        (Some("adf"), None) | (Some("stationarity"), None) => Task::StationarityTest,
        (Some("forecast"), None) => Task::Forecast,
        (Some("select"), Some(symbol)) => Task::Select(parse_asset(symbol)?),
        (Some("quit"), None) | (Some("exit"), None) => return Ok(None),
        _ => return Err(format!("Unknown command: {}", line.trim())),
    };
    if words.next().is_some() {
        return Err(format!("Unknown command: {}", line.trim()));
    }
    Ok(Some(task))
}
