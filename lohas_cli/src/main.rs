mod loader;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use lohas_core::common::time::parse_trade_date;
use lohas_core::{LatestSnapshot, LohasConfig, TrendAnalyzer, TrendReport};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use loader::load_price_csv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "lohas")]
#[command(about = "LOHAS 5-Lines and channel analysis over daily closing prices")]
struct Cli {
    /// Price CSV with date and close columns, or a directory of them
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// JSON file with analysis settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Moving-average window in trading days
    #[arg(long)]
    window: Option<usize>,

    /// Channel half-width in rolling standard deviations
    #[arg(long)]
    multiplier: Option<f64>,

    /// Regression x axis: index or elapsed_days
    #[arg(long)]
    x_axis: Option<String>,

    /// Scoring rule: channel_adjusted, regression_only or table
    #[arg(long)]
    score_rule: Option<String>,

    /// Ignore closes before this date
    #[arg(long)]
    since: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Decimal places in printed prices
    #[arg(long, default_value_t = 2)]
    digits: i32,
}

/// Output row, one per analyzed file
#[derive(Debug, Serialize)]
struct ScoreRow {
    symbol: String,
    #[serde(flatten)]
    snapshot: LatestSnapshot,
    regression_zone: String,
    channel_zone: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    info!(
        "window={} multiplier={} x_axis={} score_rule={}",
        config.ma_window, config.ma_multiplier, config.five_lines.x_axis, config.score_method()
    );
    let analyzer = TrendAnalyzer::new(config);
    let since = cli.since.as_deref().map(parse_trade_date).transpose()?;

    if cli.path.is_dir() {
        return run_directory(&cli, &analyzer, since);
    }

    let row = analyze_file(&cli.path, &analyzer, since, cli.digits)?;
    print_row(&row, cli.format, true)?;
    Ok(())
}

/// Settings from the config file, then command-line overrides
fn build_config(cli: &Cli) -> Result<LohasConfig> {
    let mut conf: HashMap<String, Value> = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("config {} is not a JSON object", path.display()))?
        }
        None => HashMap::new(),
    };

    if let Some(window) = cli.window {
        conf.insert("ma_window".to_string(), Value::from(window));
    }
    if let Some(multiplier) = cli.multiplier {
        conf.insert("ma_multiplier".to_string(), Value::from(multiplier));
    }
    if let Some(x_axis) = &cli.x_axis {
        conf.insert("x_axis".to_string(), Value::from(x_axis.as_str()));
    }
    if let Some(rule) = &cli.score_rule {
        conf.insert("score_rule".to_string(), Value::from(rule.as_str()));
    }

    Ok(LohasConfig::new(Some(conf))?)
}

fn analyze_file(path: &Path, analyzer: &TrendAnalyzer, since: Option<NaiveDate>, digits: i32) -> Result<ScoreRow> {
    let mut series = load_price_csv(path)?;
    if let Some(start) = since {
        series = series.since(start)?;
    }
    let report: TrendReport = analyzer
        .analyze(&series)
        .with_context(|| format!("{}: {} points", path.display(), series.len()))?;

    Ok(ScoreRow {
        symbol: symbol_of(path),
        snapshot: report.latest.rounded(digits),
        regression_zone: report.regression_zone.to_string(),
        channel_zone: report.channel_zone.to_string(),
    })
}

fn run_directory(cli: &Cli, analyzer: &TrendAnalyzer, since: Option<NaiveDate>) -> Result<()> {
    let mut files: Vec<PathBuf> = fs::read_dir(&cli.path)
        .with_context(|| format!("failed to list {}", cli.path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("csv"))
        .collect();
    files.sort();

    if files.is_empty() {
        bail!("no csv files in {}", cli.path.display());
    }
    info!("Processing {} files from {}", files.len(), cli.path.display());

    let mut failed = Vec::new();
    for path in &files {
        match analyze_file(path, analyzer, since, cli.digits) {
            Ok(row) => print_row(&row, cli.format, false)?,
            Err(e) => {
                warn!("{}: {:#}", symbol_of(path), e);
                failed.push(format!("{}: {:#}", symbol_of(path), e));
            }
        }
    }

    info!("Successfully processed: {}", files.len() - failed.len());
    info!("Failed: {}", failed.len());
    for line in &failed {
        info!("  {}", line);
    }
    Ok(())
}

fn symbol_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn print_row(row: &ScoreRow, format: OutputFormat, detailed: bool) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(row)?),
        OutputFormat::Text if detailed => {
            let s = &row.snapshot;
            println!("{}  {}  close {}", row.symbol, s.date, s.close);
            println!("  5-Lines  +2SD {}  +1SD {}  trend {}  -1SD {}  -2SD {}",
                s.upper_2sd, s.upper_1sd, s.trend_line, s.lower_1sd, s.lower_2sd);
            println!("  Channel  top {}  mid {}  bottom {}", s.channel_top, s.channel_mid, s.channel_bottom);
            println!("  Position {} / {} channel", row.regression_zone, row.channel_zone);
            println!("  Score    {}", s.score);
        }
        OutputFormat::Text => {
            let s = &row.snapshot;
            println!("{}\t{}\t{}\t{}\t{}\t{}",
                row.symbol, s.date, s.close, s.score, row.regression_zone, row.channel_zone);
        }
    }
    Ok(())
}
