//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{read_table, write_canonical_series_file, CsvPriceAdapter};
use crate::adapters::csv_forecast_adapter::CsvForecastAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_adapter::JsonStrategyAdapter;
use crate::domain::config_validation::{parse_quantile_levels, validate_settings_config};
use crate::domain::drawdown::Scale;
use crate::domain::error::RiskError;
use crate::domain::forecast::{ForecastColumns, QuantileLevel};
use crate::domain::pipeline::{
    compute_portfolio_risk, AssetFailurePolicy, PortfolioRun, RiskSettings,
    DEFAULT_QUANTILE_LEVELS,
};
use crate::domain::series::{
    normalize_prices, NormalizeOptions, DEFAULT_GROUP_COLUMN, DEFAULT_PRICE_COLUMN,
    DEFAULT_SERIES_ID,
};
use crate::domain::strategy::StrategyConfig;
use crate::domain::table::Table;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;

pub const DEFAULT_INDEX_COLUMN: &str = "date";

#[derive(Parser, Debug)]
#[command(name = "blackguard", about = "Forecast-driven behavioural risk scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a portfolio of strategies against precomputed forecasts
    Score {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        strategies: PathBuf,
        #[arg(short, long)]
        forecasts: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Write price history as a canonical log-price series
    Normalize {
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate a strategy file
    Validate {
        #[arg(short, long)]
        strategies: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Score {
            config,
            prices,
            strategies,
            forecasts,
            json,
        } => run_score(config.as_deref(), &prices, &strategies, &forecasts, json),
        Command::Normalize {
            prices,
            config,
            output,
        } => run_normalize(&prices, config.as_deref(), &output),
        Command::Validate { strategies } => run_validate(&strategies),
    }
}

fn fail(err: RiskError) -> ExitCode {
    tracing::error!("{err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, RiskError> {
    FileConfigAdapter::from_file(path).map_err(|e| RiskError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Load and validate the settings file, or fall back to defaults.
pub fn load_settings(path: Option<&Path>) -> Result<(RiskSettings, String), RiskError> {
    let adapter = match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading config");
            load_config(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_settings_config(&adapter)?;
    Ok((build_settings(&adapter)?, index_column(&adapter)))
}

fn string_or(config: &dyn ConfigPort, section: &str, key: &str, default: &str) -> String {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> RiskError {
    RiskError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

pub fn index_column(config: &dyn ConfigPort) -> String {
    string_or(config, "data", "index_column", DEFAULT_INDEX_COLUMN)
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<RiskSettings, RiskError> {
    let normalize = NormalizeOptions {
        price_column: string_or(config, "data", "price_column", DEFAULT_PRICE_COLUMN),
        group_column: string_or(config, "data", "group_column", DEFAULT_GROUP_COLUMN),
        default_series_id: string_or(config, "data", "default_series_id", DEFAULT_SERIES_ID),
    };

    let defaults = ForecastColumns::default();
    let forecast_columns = ForecastColumns {
        id: string_or(config, "forecast", "id_column", &defaults.id),
        timestamp: string_or(config, "forecast", "timestamp_column", &defaults.timestamp),
        quantile: string_or(config, "forecast", "quantile_column", &defaults.quantile),
        value: string_or(config, "forecast", "value_column", &defaults.value),
    };

    let quantile_level = QuantileLevel::new(config.get_double("forecast", "quantile_level", 0.5))
        .map_err(|e| invalid("forecast", "quantile_level", e.to_string()))?;

    let quantile_levels = match config.get_string("forecast", "quantile_levels") {
        Some(raw) => parse_quantile_levels(&raw)
            .map_err(|reason| invalid("forecast", "quantile_levels", reason))?,
        None => DEFAULT_QUANTILE_LEVELS.to_vec(),
    };

    let fallback_scale = match config.get_string("forecast", "fallback_scale") {
        Some(raw) => raw
            .parse::<Scale>()
            .map_err(|reason| invalid("forecast", "fallback_scale", reason))?,
        None => Scale::Unknown,
    };

    let on_asset_error = match config.get_string("portfolio", "on_asset_error") {
        Some(raw) => raw
            .parse::<AssetFailurePolicy>()
            .map_err(|reason| invalid("portfolio", "on_asset_error", reason))?,
        None => AssetFailurePolicy::default(),
    };

    Ok(RiskSettings {
        normalize,
        forecast_columns,
        quantile_level,
        quantile_levels,
        fallback_scale,
        on_asset_error,
    })
}

/// Load every input and run the portfolio pipeline.
pub fn score_portfolio(
    config_path: Option<&Path>,
    prices_path: &Path,
    strategies_path: &Path,
    forecasts_dir: &Path,
) -> Result<(PortfolioRun, BTreeMap<String, StrategyConfig>), RiskError> {
    let (settings, index_column) = load_settings(config_path)?;

    tracing::info!(path = %strategies_path.display(), "loading strategies");
    let strategies = JsonStrategyAdapter::from_file(strategies_path)?.by_symbol()?;

    tracing::info!(path = %prices_path.display(), "loading prices");
    let price_adapter = CsvPriceAdapter::from_file(
        prices_path,
        &index_column,
        &settings.normalize.group_column,
    )?;
    let prices = prices_for_strategies(&price_adapter, &strategies)?;

    let forecaster = CsvForecastAdapter::open(forecasts_dir.to_path_buf())?;
    let run = compute_portfolio_risk(&prices, &strategies, &forecaster, &settings)?;
    Ok((run, strategies))
}

/// Price tables for the strategy symbols only; other symbols in the price
/// source are ignored. Symbols without price rows are a key mismatch.
pub fn prices_for_strategies(
    source: &dyn PriceDataPort,
    strategies: &BTreeMap<String, StrategyConfig>,
) -> Result<BTreeMap<String, Table>, RiskError> {
    let available: BTreeSet<String> = source.list_symbols()?.into_iter().collect();
    let missing: BTreeSet<String> = strategies
        .keys()
        .filter(|symbol| !available.contains(*symbol))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RiskError::KeyMismatch {
            difference: missing,
        });
    }

    let unused = available.len() - strategies.len();
    if unused > 0 {
        tracing::debug!(unused, "price symbols without a strategy are ignored");
    }

    strategies
        .keys()
        .map(|symbol| Ok((symbol.clone(), source.fetch_prices(symbol)?)))
        .collect()
}

pub fn render_summary(run: &PortfolioRun, strategies: &BTreeMap<String, StrategyConfig>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>5} {:>8} {:<10} {:>7}\n",
        "ASSET", "SCORE", "E[MDD]", "LEVEL", "WEIGHT"
    ));
    for (asset, result) in &run.result.per_asset {
        let weight = strategies
            .get(asset)
            .map(|s| s.position_size_pct)
            .unwrap_or(0.0);
        out.push_str(&format!(
            "{:<10} {:>5} {:>7.2}% {:<10} {:>7.2}\n",
            asset,
            result.score,
            result.drawdown * 100.0,
            result.level().to_string(),
            weight
        ));
    }
    for skipped in &run.skipped {
        out.push_str(&format!("skipped {}: {}\n", skipped.asset, skipped.reason));
    }
    out.push_str(&format!(
        "Portfolio risk score: {:.2} ({})\n",
        run.result.aggregate_score,
        run.result.level()
    ));
    out
}

fn run_score(
    config_path: Option<&Path>,
    prices_path: &Path,
    strategies_path: &Path,
    forecasts_dir: &Path,
    json: bool,
) -> ExitCode {
    let (run, strategies) =
        match score_portfolio(config_path, prices_path, strategies_path, forecasts_dir) {
            Ok(r) => r,
            Err(e) => return fail(e),
        };

    if json {
        match serde_json::to_string_pretty(&run) {
            Ok(text) => println!("{text}"),
            Err(e) => return fail(RiskError::data(format!("failed to encode result: {e}"))),
        }
    } else {
        print!("{}", render_summary(&run, &strategies));
    }
    ExitCode::SUCCESS
}

/// Normalize a price file and write the canonical series. Returns the
/// number of points written.
pub fn normalize_file(
    prices_path: &Path,
    config_path: Option<&Path>,
    output_path: &Path,
) -> Result<usize, RiskError> {
    let (settings, index_column) = load_settings(config_path)?;
    let file = fs::File::open(prices_path).map_err(|e| {
        RiskError::data(format!("failed to read {}: {}", prices_path.display(), e))
    })?;
    let table = read_table(file, Some(&index_column))?;
    let series = normalize_prices(&table, &settings.normalize)?;
    write_canonical_series_file(output_path, &series)?;
    Ok(series.len())
}

fn run_normalize(prices_path: &Path, config_path: Option<&Path>, output_path: &Path) -> ExitCode {
    match normalize_file(prices_path, config_path, output_path) {
        Ok(points) => {
            tracing::info!(points, output = %output_path.display(), "wrote canonical series");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(strategies_path: &Path) -> ExitCode {
    tracing::info!(path = %strategies_path.display(), "validating strategies");
    let adapter = match JsonStrategyAdapter::from_file(strategies_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    for strategy in adapter.entries() {
        println!(
            "{}: {} entry {:.2}, take profit {:.2}, stop loss {:.2}, horizon {} days, weight {:.2}",
            strategy.symbol.as_deref().unwrap_or("-"),
            strategy.side,
            strategy.entry_price,
            strategy.take_profit_price(),
            strategy.stop_loss_price(),
            strategy.horizon(),
            strategy.position_size_pct,
        );
    }

    if let Err(e) = adapter.by_symbol() {
        return fail(e);
    }

    println!("{} strategies are valid.", adapter.entries().len());
    ExitCode::SUCCESS
}
