use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use weightrs::chart::{ChartBuilder, ChartData, ChartRow, SeriesMode};
use weightrs::config::AppConfig;
use weightrs::corridor::CorridorPosition;
use weightrs::error::WeightRsError;
use weightrs::export::{self, ExportFormat};
use weightrs::import::{ImportManager, ImportReport};
use weightrs::logging::{init_logging, LogLevel};
use weightrs::models::{DateRange, Measurement};

/// WeightRS - Body Weight Trend Analysis CLI
///
/// Imports weight measurements, aggregates them per day and reports the
/// trend line and goal corridor for the selected window.
#[derive(Parser)]
#[command(name = "weightrs")]
#[command(author = "WeightRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Weight Trend Analysis CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import and validate measurements
    Import {
        /// Input file path (CSV entries, spreadsheet CSV or workbook, JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// File format: excel, spreadsheet, csv, json (auto-detect if not specified)
        #[arg(long)]
        format: Option<String>,

        /// Write the normalized measurements here (.csv or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Daily values with trend line and goal corridor
    Chart {
        /// Input file path
        #[arg(short, long)]
        file: PathBuf,

        /// Date range start (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Date range end (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Show only the last N days
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last: Option<u32>,

        /// Plot every measurement instead of daily averages
        #[arg(short, long)]
        individual: bool,

        /// Output format (table, json, csv)
        #[arg(long, default_value = "table")]
        format: String,

        /// Write the chart rows to a file instead of the terminal
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Trend slope and projected goal date over the whole history
    Trend {
        /// Input file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Configure application settings
    Config {
        /// List all configuration options
        #[arg(short, long)]
        list: bool,

        /// Set a configuration value (KEY=VALUE)
        #[arg(short, long)]
        set: Option<String>,

        /// Get a configuration value
        #[arg(short, long)]
        get: Option<String>,
    },
}

#[derive(Tabled)]
struct ChartTableRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Floor")]
    floor: String,
    #[tabled(rename = "Ceiling")]
    ceiling: String,
    #[tabled(rename = "Ideal")]
    ideal: String,
}

impl From<ChartRow> for ChartTableRow {
    fn from(row: ChartRow) -> Self {
        let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v));
        ChartTableRow {
            date: row.label,
            value: format!("{:.2}", row.value),
            trend: cell(row.trend),
            floor: cell(row.floor),
            ceiling: cell(row.ceiling),
            ideal: cell(row.ideal),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load_or_default(&config_path)?;

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    let result = match cli.command {
        Commands::Import {
            file,
            format,
            output,
        } => run_import(&config, &file, format.as_deref(), output.as_deref()),
        Commands::Chart {
            file,
            from,
            to,
            last,
            individual,
            format,
            output,
        } => {
            let options = ChartOptions {
                from,
                to,
                last,
                individual,
                format,
                output,
            };
            run_chart(&config, &file, &options)
        }
        Commands::Trend { file } => run_trend(&config, &file),
        Commands::Config { list, set, get } => {
            run_config(&mut config, &config_path, list, set, get)
        }
    };

    if let Err(e) = &result {
        if let Some(err) = e.downcast_ref::<WeightRsError>() {
            tracing::error!(severity = ?err.severity(), error = %err, "Command failed");
            eprintln!("{} {}", "✗".red().bold(), err.user_message().red());
        }
    }

    result
}

fn load_measurements(
    config: &AppConfig,
    file: &Path,
    format: Option<&str>,
) -> Result<ImportReport> {
    let manager = ImportManager::new(config.timezone()?, config.import.slots);
    let report = match format {
        Some(name) => manager.import_with_format(file, name)?,
        None => manager.import_file(file)?,
    };
    Ok(report)
}

fn print_row_errors(report: &ImportReport) {
    if report.has_errors() {
        println!(
            "{}",
            format!("⚠ {} row(s) skipped:", report.errors.len()).yellow()
        );
        for error in &report.errors {
            println!("  {}", error.to_string().yellow());
        }
    }
}

fn run_import(
    config: &AppConfig,
    file: &Path,
    format: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    println!("{}", "Importing measurements...".green().bold());
    println!("  File: {}", file.display());

    let report = load_measurements(config, file, format)?;
    print_row_errors(&report);

    if let Some(output) = output {
        let export_format = ExportFormat::from_path(output)?;
        export::export_measurements(&report.measurements, export_format, output)?;
        println!("  Written to: {}", output.display());
    }

    println!(
        "{}",
        format!("✓ Imported {} measurement(s)", report.imported()).green()
    );
    Ok(())
}

struct ChartOptions {
    from: Option<String>,
    to: Option<String>,
    last: Option<u32>,
    individual: bool,
    format: String,
    output: Option<PathBuf>,
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

fn display_range(config: &AppConfig, options: &ChartOptions) -> Result<DateRange> {
    let today = Utc::now().with_timezone(&config.timezone()?).date_naive();

    if let Some(days) = options.last {
        return Ok(DateRange::last_days(days, today));
    }

    let from = options.from.as_deref().map(parse_day).transpose()?;
    let to = options.to.as_deref().map(parse_day).transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            bail!("--from {} is after --to {}", from, to);
        }
    }

    if from.is_none() && to.is_none() {
        if let Some(days) = config.settings.default_window_days {
            return Ok(DateRange::last_days(days, today));
        }
    }

    Ok(DateRange::new(from, to))
}

fn build_chart(
    config: &AppConfig,
    measurements: &[Measurement],
    range: DateRange,
    mode: SeriesMode,
) -> Result<ChartData> {
    Ok(ChartBuilder::new(config.timezone()?)
        .with_goal(config.effective_goal())
        .with_range(range)
        .with_mode(mode)
        .build(measurements))
}

fn run_chart(config: &AppConfig, file: &Path, options: &ChartOptions) -> Result<()> {
    let report = load_measurements(config, file, None)?;
    let range = display_range(config, options)?;
    let mode = if options.individual || !config.settings.show_daily_averages {
        SeriesMode::Individual
    } else {
        SeriesMode::Daily
    };
    let chart = build_chart(config, &report.measurements, range, mode)?;

    if let Some(output) = &options.output {
        let export_format = match options.format.as_str() {
            "table" => ExportFormat::from_path(output)?,
            other => ExportFormat::from_str(other)?,
        };
        export::export_chart(&chart, export_format, output)?;
        println!(
            "{}",
            format!("✓ Chart data written to {}", output.display()).green()
        );
        return Ok(());
    }

    match options.format.as_str() {
        "table" => {
            print_row_errors(&report);
            print_chart_table(&chart, config.goal.target_value);
        }
        "json" => export::json::write_json(&chart, io::stdout().lock())?,
        "csv" => export::csv::write_chart(&chart, io::stdout().lock())?,
        other => bail!("Unknown chart format '{}': use table, json or csv", other),
    }

    Ok(())
}

fn print_chart_table(chart: &ChartData, target: f64) {
    if chart.is_empty() {
        println!("{}", "No measurements in the selected range".yellow());
        return;
    }

    let rows: Vec<ChartTableRow> = chart.rows().into_iter().map(ChartTableRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    let summary = &chart.summary;
    println!("{}", "Summary".bold());
    println!("  Points: {} over {} day(s)", summary.points, summary.days);
    if let (Some(latest), Some(change)) = (summary.latest_value, summary.change) {
        println!("  Latest: {:.2} ({:+.2} in window)", latest, change);
    }
    if let Some(position) = summary.latest_position {
        let text = position.description();
        let colored_text = match position {
            CorridorPosition::Within => text.green(),
            CorridorPosition::BelowFloor => text.cyan(),
            CorridorPosition::AboveCeiling => text.red(),
        };
        println!("  Corridor: {}", colored_text);
    }
    print_trend_summary(chart, target);
}

fn print_trend_summary(chart: &ChartData, target: f64) {
    let summary = &chart.summary;
    match (summary.trend_per_week, summary.trend_direction) {
        (Some(per_week), Some(direction)) => {
            println!(
                "  Trend: {:+.3}/day, {:+.2}/week ({})",
                per_week / 7.0,
                per_week,
                direction.description()
            );
        }
        _ => println!("  Trend: {}", "not enough data".dimmed()),
    }

    if target > 0.0 {
        match summary.projected_goal_date {
            Some(date) => println!("  Goal {:.1} projected for {}", target, date.to_string().bold()),
            None => println!("  Goal {:.1}: {}", target, "not on current trend".dimmed()),
        }
    }
}

fn run_trend(config: &AppConfig, file: &Path) -> Result<()> {
    let report = load_measurements(config, file, None)?;
    let chart = build_chart(
        config,
        &report.measurements,
        DateRange::unbounded(),
        SeriesMode::Daily,
    )?;

    println!("{}", "Trend over full history".cyan().bold());
    println!(
        "  Measurements: {} on {} day(s)",
        report.imported(),
        chart.summary.days
    );
    print_trend_summary(&chart, config.goal.target_value);
    Ok(())
}

fn run_config(
    config: &mut AppConfig,
    config_path: &Path,
    list: bool,
    set: Option<String>,
    get: Option<String>,
) -> Result<()> {
    if let Some(key_value) = set {
        let (key, value) = key_value
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", key_value))?;
        config.set_value(key.trim(), value)?;
        config.save_to_file(config_path)?;
        println!("{}", format!("✓ {} = {}", key.trim(), value.trim()).green());
    } else if let Some(key) = get {
        println!("{}", config.get_value(&key)?);
    } else if list {
        println!("{}", format!("Configuration: {}", config_path.display()).bold());
        for (key, value) in config.list_values() {
            let shown = if value.is_empty() {
                "(unset)".dimmed().to_string()
            } else {
                value
            };
            println!("  {} = {}", key.cyan(), shown);
        }
    } else {
        println!("{}", "Nothing to do: pass --list, --get KEY or --set KEY=VALUE".yellow());
    }

    Ok(())
}
