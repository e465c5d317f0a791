//! salesboard - Period-based sales reporting from a cleaned snapshot

mod cli;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use salesboard_core::analytics::{
    aggregate, daily_totals, detect_anomalies, generate_summary, item_quantities, recommendations,
    resolve, select, Resolution,
};
use salesboard_core::models::{Column, Metric, Record};
use salesboard_core::{
    export_items_to_csv, export_report_to_markdown, export_series_to_csv, export_to_json,
    AnalyticsConfig, FileWatcher, Period, TableStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "salesboard",
    version,
    about = "Period-based sales reporting and rollups",
    long_about = "Loads the cleaned sales snapshot (data.json) and answers period questions:\n\
                  dashboard reports, trend series, whole-table insights and keyword chat.\n\
                  \n\
                  Periods: daily, weekly, monthly, quarterly (3month), half-yearly (6month),\n\
                  yearly, all-time (all)\n\
                  \n\
                  Examples:\n\
                    salesboard report --period weekly      # Dashboard for the last 7 days\n\
                    salesboard series --period monthly --out trend.csv\n\
                    salesboard ask \"top selling items this month\"\n\
                    salesboard summary --json              # Insights for the full table\n\
                    salesboard watch                       # Reload on every snapshot rewrite\n\
                  \n\
                  Environment Variables:\n\
                    SALESBOARD_DATA                        # Snapshot path\n\
                    SALESBOARD_NO_COLOR                    # Disable ANSI colors\n\
                    SALESBOARD_LOG                         # Log filter (warn, info, debug...)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Snapshot written by the cleaning step
    #[arg(long, global = true, env = "SALESBOARD_DATA", default_value = "static/data.json")]
    data: PathBuf,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, global = true, env = "SALESBOARD_NO_COLOR")]
    no_color: bool,

    /// Log filter for stderr output
    #[arg(long, global = true, env = "SALESBOARD_LOG", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the dashboard report for a period
    Report {
        #[arg(long, short, default_value = "all-time")]
        period: Period,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Also write the report to a file (.json or Markdown)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write per-item quantities for the period to CSV
        #[arg(long)]
        items_out: Option<PathBuf>,
    },
    /// Print the revenue trend series for a period
    Series {
        #[arg(long, short, default_value = "all-time")]
        period: Period,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Write the series to CSV
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask a question in plain words
    Ask {
        question: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Insights for the whole table
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep the snapshot loaded and report every reload
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = AnalyticsConfig::default();
    let no_color = cli.no_color;

    match cli.command {
        Command::Report {
            period,
            json,
            out,
            items_out,
        } => {
            run_report(&cli.data, period, json, out, items_out, &config, no_color).await?;
        }
        Command::Series { period, json, out } => {
            run_series(&cli.data, period, json, out, no_color).await?;
        }
        Command::Ask { question, json } => {
            run_ask(&cli.data, &question, json, &config).await?;
        }
        Command::Summary { json } => {
            run_summary(&cli.data, json, &config, no_color).await?;
        }
        Command::Watch => {
            run_watch(cli.data).await?;
        }
    }

    Ok(())
}

/// Stderr logging; `RUST_LOG` wins over `--log-level` when set
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load the snapshot into a fresh store; a missing or unreadable file is fatal here
async fn load_store(data: &Path) -> Result<Arc<TableStore>> {
    let store = Arc::new(TableStore::with_defaults(data.to_path_buf()));
    let report = store.initial_load().await;

    if !report.snapshot_loaded {
        let reason = report
            .errors
            .last()
            .map(|e| match &e.suggestion {
                Some(hint) => format!("{} (hint: {})", e.message, hint),
                None => e.message.clone(),
            })
            .unwrap_or_else(|| "snapshot not loaded".to_string());
        return Err(anyhow!(reason))
            .with_context(|| format!("Failed to load snapshot {}", data.display()));
    }

    for warning in report.warnings() {
        warn!(source = %warning.source, "{}", warning.message);
    }

    Ok(store)
}

async fn run_report(
    data: &Path,
    period: Period,
    json: bool,
    out: Option<PathBuf>,
    items_out: Option<PathBuf>,
    config: &AnalyticsConfig,
    no_color: bool,
) -> Result<()> {
    let store = load_store(data).await?;
    let report = store.dashboard(period, config);

    println!("{}", cli::format_report(&report, json, no_color));

    if let Some(path) = out {
        if path.extension().is_some_and(|ext| ext == "json") {
            export_to_json(&report, &path)?;
        } else {
            export_report_to_markdown(&report, &path)?;
        }
        eprintln!("Report written to {}", path.display());
    }

    if let Some(path) = items_out {
        let table = store.table();
        let scope = select(&table, period).context("Failed to select period")?;
        let items = item_quantities(table.schema(), scope.records())
            .context("Item export needs 'Item' and 'Quantity' columns")?;
        export_items_to_csv(&items, &path)?;
        eprintln!("{} items written to {}", items.len(), path.display());
    }

    Ok(())
}

async fn run_series(
    data: &Path,
    period: Period,
    json: bool,
    out: Option<PathBuf>,
    no_color: bool,
) -> Result<()> {
    let store = load_store(data).await?;
    let table = store.table();

    let window = match resolve(&table, period).context("Failed to resolve period")? {
        Resolution::Window(window) => window,
        Resolution::Empty {
            history_days,
            required_days,
            ..
        } => {
            println!(
                "No data available for {} period ({} days of history, {} needed).",
                period.label(),
                history_days,
                required_days
            );
            return Ok(());
        }
    };

    let series = aggregate(&table, &window, Metric::NetSales)
        .context("Trend series needs 'Date' and 'Net sales' columns")?;
    println!("{}", cli::format_series(&series, json, no_color));

    if let Some(path) = out {
        export_series_to_csv(&series, &path)?;
        eprintln!("Series written to {}", path.display());
    }

    Ok(())
}

async fn run_ask(data: &Path, question: &str, json: bool, config: &AnalyticsConfig) -> Result<()> {
    let store = load_store(data).await?;
    let answer = store.ask(question, config);
    println!("{}", cli::format_answer(&answer, json));
    Ok(())
}

async fn run_summary(data: &Path, json: bool, config: &AnalyticsConfig, no_color: bool) -> Result<()> {
    let store = load_store(data).await?;
    let table = store.table();

    let insights = generate_summary(&table, config);
    let lines = recommendations(&insights);

    let anomalies = if table.schema().has_all(&[Column::Date, Column::NetSales]) {
        let records: Vec<&Record> = table.records().iter().collect();
        detect_anomalies(&daily_totals(&records, Metric::NetSales), config)
    } else {
        Vec::new()
    };

    println!(
        "{}",
        cli::format_summary(&insights, &lines, &anomalies, json, no_color)
    );
    Ok(())
}

async fn run_watch(data: PathBuf) -> Result<()> {
    let store = load_store(&data).await?;
    let mut events = store.event_bus().subscribe();

    let watcher = FileWatcher::start(Arc::clone(&store), Default::default())
        .await
        .context("Failed to start file watcher")?;

    println!(
        "Watching {} ({} rows loaded). Press Ctrl+C to stop.",
        data.display(),
        store.table().len()
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("{}", cli::format_event(&event)),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    watcher.stop().await;
    info!("Watch stopped");
    Ok(())
}
