use crate::loader::{CsvSource, MetricSource};
use crate::models::{Baseline, Granularity};
use crate::storage::{WarehouseSource, DEFAULT_TABLE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Csv,
    Warehouse,
}

/// Where the daily metrics table is read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_table")]
    pub table: String,
}

/// Report defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub granularity: Granularity,

    /// Channel totals accrued before the tracked window began.
    #[serde(default)]
    pub baseline: Option<Baseline>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_csv_path() -> PathBuf {
    PathBuf::from("data/youtube_channel_data.csv")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/channel.duckdb")
}
fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            csv_path: default_csv_path(),
            db_path: default_db_path(),
            table: default_table(),
        }
    }
}

impl SourceConfig {
    pub fn build(&self) -> Box<dyn MetricSource> {
        match self.kind {
            SourceKind::Csv => Box::new(CsvSource::new(&self.csv_path)),
            SourceKind::Warehouse => Box::new(WarehouseSource::new(&self.db_path, &self.table)),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("YTDASH").separator("__"))
            .build()
            .context("Failed to read configuration")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
