//! DuckDB-backed analytical table the dashboard can read instead of a CSV.

use crate::error::{DashboardError, Result};
use crate::loader::cleaner::parse_date;
use crate::loader::{MetricSource, SourceId};
use crate::models::{SourceRow, SourceTable, WatchUnit};
use chrono::Utc;
use duckdb::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS channel_daily_metrics (
    date                              DATE    PRIMARY KEY,
    subscribers_gained                BIGINT  NOT NULL,
    subscribers_lost                  BIGINT  NOT NULL,
    views                             BIGINT  NOT NULL,
    watch_hours                       DOUBLE  NOT NULL,
    likes                             BIGINT  NOT NULL,
    comments                          BIGINT  NOT NULL,
    shares                            BIGINT  NOT NULL,
    average_view_duration_percentage  DOUBLE,
    loaded_at                         TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

pub const DEFAULT_TABLE: &str = "channel_daily_metrics";

// ── Warehouse ─────────────────────────────────────────────────────────────────

pub struct Warehouse {
    conn: Connection,
}

impl Warehouse {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens an existing database only; reading must never create one.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DashboardError::unavailable(format!(
                "warehouse database {:?} does not exist",
                path
            )));
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    /// Upsert a table of source rows, converting watch time to hours.
    /// Re-importing the same day replaces it.
    pub fn import(&self, table: &SourceTable) -> Result<usize> {
        if table.rows.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().naive_utc();
        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO channel_daily_metrics
                (date, subscribers_gained, subscribers_lost, views, watch_hours,
                 likes, comments, shares, average_view_duration_percentage, loaded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (date) DO UPDATE SET
                subscribers_gained = excluded.subscribers_gained,
                subscribers_lost   = excluded.subscribers_lost,
                views              = excluded.views,
                watch_hours        = excluded.watch_hours,
                likes              = excluded.likes,
                comments           = excluded.comments,
                shares             = excluded.shares,
                average_view_duration_percentage = excluded.average_view_duration_percentage,
                loaded_at          = excluded.loaded_at
        "#;

        for row in &table.rows {
            let date = parse_date(&row.date).ok_or_else(|| {
                DashboardError::unavailable(format!("malformed date {:?}", row.date))
            })?;
            let watch_hours = match table.watch_unit {
                WatchUnit::Hours => row.watch_time,
                WatchUnit::Minutes => row.watch_time / 60.0,
            };
            tx.execute(sql, params![
                date,
                row.subscribers_gained, row.subscribers_lost,
                row.views, watch_hours,
                row.likes, row.comments, row.shares,
                row.average_view_duration_percentage,
                now,
            ])?;
        }

        tx.commit()?;
        Ok(table.rows.len())
    }

    /// The single fixed read the dashboard performs per session.
    pub fn fetch_daily_metrics(&self, table: &str) -> Result<SourceTable> {
        if !is_identifier(table) {
            return Err(DashboardError::unavailable(format!("invalid table name {:?}", table)));
        }
        if !self.table_exists(table)? {
            return Err(DashboardError::unavailable(format!("table {} does not exist", table)));
        }

        let sql = format!(
            r#"SELECT CAST(date AS VARCHAR), subscribers_gained, subscribers_lost, views,
                      watch_hours, likes, comments, shares, average_view_duration_percentage
               FROM {} ORDER BY date"#,
            table
        );
        debug!("warehouse query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |r| {
                Ok(SourceRow {
                    date: r.get(0)?,
                    subscribers_gained: r.get(1)?,
                    subscribers_lost: r.get(2)?,
                    views: r.get(3)?,
                    watch_time: r.get(4)?,
                    likes: r.get(5)?,
                    comments: r.get(6)?,
                    shares: r.get(7)?,
                    average_view_duration_percentage: r.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(DashboardError::unavailable(format!("table {} is empty", table)));
        }
        if let Some(bad) = rows.iter().find(|r| has_negative(r)) {
            return Err(DashboardError::unavailable(format!(
                "negative metric value on {}",
                bad.date
            )));
        }

        Ok(SourceTable { watch_unit: WatchUnit::Hours, rows })
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        if !is_identifier(table) {
            return Err(DashboardError::unavailable(format!("invalid table name {:?}", table)));
        }
        let mut s = self.conn.prepare(&format!("SELECT COUNT(*) FROM {}", table))?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let mut s = self.conn.prepare(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
        )?;
        let n: i64 = s.query_row(params![table], |r| r.get(0))?;
        Ok(n > 0)
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn has_negative(r: &SourceRow) -> bool {
    [r.subscribers_gained, r.subscribers_lost, r.views, r.likes, r.comments, r.shares]
        .iter()
        .any(|v| *v < 0)
        || r.watch_time < 0.0
        || r.average_view_duration_percentage.is_some_and(|p| p < 0.0)
}

// ── Warehouse source ──────────────────────────────────────────────────────────

pub struct WarehouseSource {
    db_path: PathBuf,
    table: String,
}

impl WarehouseSource {
    pub fn new(db_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self { db_path: db_path.into(), table: table.into() }
    }
}

impl MetricSource for WarehouseSource {
    fn id(&self) -> SourceId {
        SourceId::Warehouse { db_path: self.db_path.clone(), table: self.table.clone() }
    }

    fn load(&self) -> Result<SourceTable> {
        let table = Warehouse::open_existing(&self.db_path)?.fetch_daily_metrics(&self.table)?;
        info!("{}: {} rows loaded", self.id(), table.rows.len());
        Ok(table)
    }
}
