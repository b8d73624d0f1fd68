//! Loaders for the daily channel metrics table.
//!
//! A source is read exactly once per session (see `session::SessionCache`);
//! nothing here retries. Any shape problem is reported as `DataUnavailable`.

pub mod cleaner;

use crate::error::{DashboardError, Result};
use crate::models::{SourceRow, SourceTable, WatchUnit};
use csv::StringRecord;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use self::cleaner::{normalise_column, parse_count, parse_optional_real, parse_real};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Identifies where a table came from; the session cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    Csv(PathBuf),
    Warehouse { db_path: PathBuf, table: String },
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Csv(p) => write!(f, "csv:{}", p.display()),
            SourceId::Warehouse { db_path, table } => {
                write!(f, "warehouse:{}#{}", db_path.display(), table)
            }
        }
    }
}

/// Swappable input abstraction: a CSV export or the warehouse table.
pub trait MetricSource {
    fn id(&self) -> SourceId;
    fn load(&self) -> Result<SourceTable>;
}

// ── CSV source ────────────────────────────────────────────────────────────────

pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MetricSource for CsvSource {
    fn id(&self) -> SourceId {
        SourceId::Csv(self.path.clone())
    }

    fn load(&self) -> Result<SourceTable> {
        load_csv(&self.path)
    }
}

/// Parse a channel export with columns DATE, SUBSCRIBERS_GAINED,
/// SUBSCRIBERS_LOST, VIEWS, WATCH_HOURS | WATCH_TIME_MINUTES, LIKES,
/// COMMENTS, SHARES and optionally AVERAGE_VIEW_DURATION_PERCENTAGE.
pub fn load_csv(path: &Path) -> Result<SourceTable> {
    if !path.is_file() {
        return Err(DashboardError::unavailable(format!(
            "CSV source {:?} does not exist",
            path
        )));
    }
    debug!("Loading channel metrics from {:?}", path);

    let file = std::fs::File::open(path)?;
    let table = read_csv(file)
        .map_err(|e| match e {
            DashboardError::DataUnavailable(msg) => {
                DashboardError::unavailable(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

    info!("{:?}: {} rows loaded", path, table.rows.len());
    Ok(table)
}

pub fn read_csv<R: Read>(input: R) -> Result<SourceTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut rows = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| DashboardError::unavailable(format!("row {}: malformed record ({})", i + 1, e)))?;
        // Trailing blank lines in hand-edited exports
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(columns.row(&record, i + 1)?);
    }

    if rows.is_empty() {
        return Err(DashboardError::unavailable("table has no data rows"));
    }

    Ok(SourceTable {
        watch_unit: columns.watch.1,
        rows,
    })
}

// ── Column mapping ────────────────────────────────────────────────────────────

const REQUIRED: [&str; 7] = [
    "DATE",
    "SUBSCRIBERS_GAINED",
    "SUBSCRIBERS_LOST",
    "VIEWS",
    "LIKES",
    "COMMENTS",
    "SHARES",
];

struct ColumnMap {
    date: usize,
    gained: usize,
    lost: usize,
    views: usize,
    watch: (usize, WatchUnit),
    likes: usize,
    comments: usize,
    shares: usize,
    avg_view_pct: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(normalise_column).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let mut missing: Vec<&str> = REQUIRED.iter().copied().filter(|c| find(c).is_none()).collect();

        let watch = match (find("WATCH_HOURS"), find("WATCH_TIME_MINUTES")) {
            (Some(i), _) => Some((i, WatchUnit::Hours)),
            (None, Some(i)) => Some((i, WatchUnit::Minutes)),
            (None, None) => {
                missing.push("WATCH_HOURS|WATCH_TIME_MINUTES");
                None
            }
        };

        let (Some(watch), true) = (watch, missing.is_empty()) else {
            return Err(DashboardError::unavailable(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        };

        // Every REQUIRED column was found above
        let idx = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            date: idx("DATE"),
            gained: idx("SUBSCRIBERS_GAINED"),
            lost: idx("SUBSCRIBERS_LOST"),
            views: idx("VIEWS"),
            watch,
            likes: idx("LIKES"),
            comments: idx("COMMENTS"),
            shares: idx("SHARES"),
            avg_view_pct: find("AVERAGE_VIEW_DURATION_PERCENTAGE"),
        })
    }

    fn row(&self, record: &StringRecord, line: usize) -> Result<SourceRow> {
        let cell = |i: usize| record.get(i).unwrap_or("");
        let bad = |col: &str, i: usize| {
            DashboardError::unavailable(format!(
                "row {}: {} is not a valid non-negative number ({:?})",
                line,
                col,
                cell(i)
            ))
        };
        let count = |col: &str, i: usize| parse_count(cell(i)).ok_or_else(|| bad(col, i));

        let date = cell(self.date).trim().to_string();
        if date.is_empty() {
            return Err(DashboardError::unavailable(format!("row {}: DATE is empty", line)));
        }

        Ok(SourceRow {
            date,
            subscribers_gained: count("SUBSCRIBERS_GAINED", self.gained)?,
            subscribers_lost: count("SUBSCRIBERS_LOST", self.lost)?,
            views: count("VIEWS", self.views)?,
            watch_time: parse_real(cell(self.watch.0)).ok_or_else(|| bad("watch time", self.watch.0))?,
            likes: count("LIKES", self.likes)?,
            comments: count("COMMENTS", self.comments)?,
            shares: count("SHARES", self.shares)?,
            average_view_duration_percentage: match self.avg_view_pct {
                Some(i) => parse_optional_real(cell(i))
                    .ok_or_else(|| bad("AVERAGE_VIEW_DURATION_PERCENTAGE", i))?,
                None => None,
            },
        })
    }
}
