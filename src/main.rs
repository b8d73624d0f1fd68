mod config;
mod error;
mod loader;
mod models;
mod output;
mod pipeline;
mod session;
mod storage;
mod utils;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, SourceKind};
use crate::loader::load_csv;
use crate::models::{Granularity, Metric};
use crate::pipeline::derive::derive;
use crate::pipeline::range::filter_range;
use crate::pipeline::{load_series, Pipeline, ReportRequest};
use crate::session::Session;
use crate::storage::{Warehouse, DEFAULT_TABLE};

#[derive(Parser)]
#[command(name = "yt-dashboard", about = "YouTube channel metrics dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Read from a CSV export or the DuckDB warehouse table
    #[arg(long, value_enum, global = true)]
    source: Option<SourceKind>,

    /// CSV export path (overrides config)
    #[arg(long, global = true, env = "YTDASH_CSV")]
    csv: Option<PathBuf>,

    /// DuckDB database path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct Window {
    /// daily, weekly, monthly, quarterly or cumulative
    #[arg(short, long)]
    granularity: Option<Granularity>,

    /// First day of the window (YYYY-MM-DD), clamped to the data
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD), clamped to the data
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Command {
    /// Key metrics: all-time totals, window totals and last-period change
    Summary {
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        json: bool,
    },

    /// One metric's chart series for the window
    Series {
        /// e.g. views, net_subscribers, watch_hours, likes
        metric: Metric,
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        json: bool,
    },

    /// Print the derived daily table (--raw) or the resampled table
    Table {
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        raw: bool,
        #[arg(long)]
        json: bool,
    },

    /// Load a CSV export into the DuckDB warehouse table
    Import {
        /// CSV file in the channel export format
        path: PathBuf,
    },

    /// Interactive session: change granularity and window, re-render on each change
    Session {
        #[command(flatten)]
        window: Window,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "yt_dashboard=info,warn",
        1 => "yt_dashboard=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = AppConfig::load()?;
    if let Some(kind) = cli.source {
        config.source.kind = kind;
    }
    if let Some(csv) = cli.csv {
        config.source.csv_path = csv;
    }
    if let Some(db) = cli.db {
        config.source.db_path = db;
    }

    let today = chrono::Local::now().date_naive();

    match cli.command {
        Command::Summary { window, json } => {
            let series = load_series(config.source.build().as_ref())?;
            let report = Pipeline::new(request(&config, &window)).run(&series, today);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", output::render_summary(&report));
            }
        }

        Command::Series { metric, window, json } => {
            let series = load_series(config.source.build().as_ref())?;
            let report = Pipeline::new(request(&config, &window)).run(&series, today);
            if json {
                let body = json!({
                    "metric": metric,
                    "granularity": report.granularity,
                    "range": report.range,
                    "points": output::series_points(&report, metric),
                    "notices": report.notices,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", output::render_series(&report, metric));
                for notice in &report.notices {
                    println!("⚠ {}", output::render_notice(notice));
                }
            }
        }

        Command::Table { window, raw, json } => {
            let series = load_series(config.source.build().as_ref())?;
            let req = request(&config, &window);
            if raw {
                let range = models::DateRange::clamped(req.start, req.end, series.bounds());
                let rows = filter_range(series.rows(), &range);
                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    println!("{}", output::render_rows(&rows));
                }
            } else {
                let report = Pipeline::new(req).run(&series, today);
                if json {
                    println!("{}", serde_json::to_string_pretty(&report.chart)?);
                } else {
                    println!("{}", output::render_chart_table(&report));
                }
            }
        }

        Command::Import { path } => {
            let _t = utils::Timer::start("CSV import");
            let table = load_csv(&path)?;
            // Same validation the dashboard applies on read
            let series = derive(&table)?;

            let db_path = &config.source.db_path;
            let warehouse = Warehouse::open(db_path)
                .with_context(|| format!("Failed to open DuckDB at {:?}", db_path))?;
            warehouse.run_migrations()?;
            let n = warehouse.import(&table)?;

            info!(
                "Imported {} days ({} → {}) into {:?}",
                n,
                series.min_date(),
                series.max_date(),
                db_path
            );
            println!(
                "{} days imported; {} rows in {}",
                utils::fmt_number(n as i64),
                utils::fmt_number(warehouse.row_count(DEFAULT_TABLE)?),
                DEFAULT_TABLE
            );
        }

        Command::Session { window } => {
            let mut session = Session::new(config.source.build(), request(&config, &window));
            session.run(io::stdin().lock(), io::stdout().lock(), today)?;
        }
    }

    Ok(())
}

fn request(config: &AppConfig, window: &Window) -> ReportRequest {
    ReportRequest {
        granularity: window.granularity.unwrap_or(config.dashboard.granularity),
        start: window.start,
        end: window.end,
        baseline: config.dashboard.baseline.clone(),
    }
}
