pub mod period;

pub use period::{DateRange, Granularity, Period, PeriodKey};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Source rows ───────────────────────────────────────────────────────────────

/// Unit the source table reports watch time in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchUnit {
    Hours,
    Minutes,
}

/// One row as read from a CSV file or the warehouse query.
/// The date stays as text until the derive step parses it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    pub date: String,
    pub subscribers_gained: i64,
    pub subscribers_lost: i64,
    pub views: i64,
    pub watch_time: f64, // in the table's WatchUnit
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub average_view_duration_percentage: Option<f64>,
}

/// Loader output: validated rows plus the unit watch time was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub watch_unit: WatchUnit,
    pub rows: Vec<SourceRow>,
}

// ── Metric values ─────────────────────────────────────────────────────────────

/// The metric columns of one day, one bucket, or one running total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub net_subscribers: i64,
    pub subscribers_gained: i64,
    pub subscribers_lost: i64,
    pub views: i64,
    pub watch_hours: f64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub average_view_duration_percentage: Option<f64>,
}

impl MetricValues {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::NetSubscribers => Some(self.net_subscribers as f64),
            Metric::SubscribersGained => Some(self.subscribers_gained as f64),
            Metric::SubscribersLost => Some(self.subscribers_lost as f64),
            Metric::Views => Some(self.views as f64),
            Metric::WatchHours => Some(self.watch_hours),
            Metric::Likes => Some(self.likes as f64),
            Metric::Comments => Some(self.comments as f64),
            Metric::Shares => Some(self.shares as f64),
            Metric::AverageViewDurationPercentage => self.average_view_duration_percentage,
        }
    }

    /// Field-wise sum of the summed metrics. The mean column is left untouched.
    pub fn add_sums(&mut self, other: &MetricValues) {
        self.net_subscribers += other.net_subscribers;
        self.subscribers_gained += other.subscribers_gained;
        self.subscribers_lost += other.subscribers_lost;
        self.views += other.views;
        self.watch_hours += other.watch_hours;
        self.likes += other.likes;
        self.comments += other.comments;
        self.shares += other.shares;
    }
}

/// Historical totals accrued before the tracked window began.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub net_subscribers: i64,
    #[serde(default)]
    pub subscribers_gained: i64,
    #[serde(default)]
    pub subscribers_lost: i64,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub watch_hours: f64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub shares: i64,
}

impl Baseline {
    pub fn as_values(&self) -> MetricValues {
        MetricValues {
            net_subscribers: self.net_subscribers,
            subscribers_gained: self.subscribers_gained,
            subscribers_lost: self.subscribers_lost,
            views: self.views,
            watch_hours: self.watch_hours,
            likes: self.likes,
            comments: self.comments,
            shares: self.shares,
            average_view_duration_percentage: None,
        }
    }
}

// ── Metric row / series ───────────────────────────────────────────────────────

/// One calendar day of channel activity, after derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: MetricValues,
}

/// Non-empty, strictly ascending by date. Transforms build new values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    rows: Vec<MetricRow>,
}

impl MetricSeries {
    /// Returns `None` when `rows` is empty or dates are not strictly ascending.
    pub fn new(rows: Vec<MetricRow>) -> Option<Self> {
        if rows.is_empty() || rows.windows(2).any(|w| w[0].date >= w[1].date) {
            return None;
        }
        Some(Self { rows })
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn min_date(&self) -> NaiveDate {
        self.rows[0].date
    }

    pub fn max_date(&self) -> NaiveDate {
        self.rows[self.rows.len() - 1].date
    }

    pub fn bounds(&self) -> DateRange {
        DateRange::new(self.min_date(), self.max_date())
    }
}

// ── Metric catalogue ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NetSubscribers,
    SubscribersGained,
    SubscribersLost,
    Views,
    WatchHours,
    Likes,
    Comments,
    Shares,
    AverageViewDurationPercentage,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::NetSubscribers,
        Metric::SubscribersGained,
        Metric::SubscribersLost,
        Metric::Views,
        Metric::WatchHours,
        Metric::Likes,
        Metric::Comments,
        Metric::Shares,
        Metric::AverageViewDurationPercentage,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Metric::NetSubscribers => "NET_SUBSCRIBERS",
            Metric::SubscribersGained => "SUBSCRIBERS_GAINED",
            Metric::SubscribersLost => "SUBSCRIBERS_LOST",
            Metric::Views => "VIEWS",
            Metric::WatchHours => "WATCH_HOURS",
            Metric::Likes => "LIKES",
            Metric::Comments => "COMMENTS",
            Metric::Shares => "SHARES",
            Metric::AverageViewDurationPercentage => "AVERAGE_VIEW_DURATION_PERCENTAGE",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::NetSubscribers => "Subscribers",
            Metric::SubscribersGained => "Subscribers Gained",
            Metric::SubscribersLost => "Subscribers Lost",
            Metric::Views => "Views",
            Metric::WatchHours => "Watch Hours",
            Metric::Likes => "Likes",
            Metric::Comments => "Comments",
            Metric::Shares => "Shares",
            Metric::AverageViewDurationPercentage => "View Duration %",
        }
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            Metric::AverageViewDurationPercentage => Aggregation::Mean,
            _ => Aggregation::Sum,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column().to_lowercase())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_uppercase().replace(['-', ' '], "_");
        if norm == "SUBSCRIBERS" {
            return Ok(Metric::NetSubscribers);
        }
        Metric::ALL
            .into_iter()
            .find(|m| m.column() == norm)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str) -> MetricRow {
        MetricRow {
            date: date.parse().unwrap(),
            values: MetricValues::default(),
        }
    }

    #[test]
    fn test_series_rejects_empty_and_unsorted() {
        assert!(MetricSeries::new(vec![]).is_none());
        assert!(MetricSeries::new(vec![row("2024-01-02"), row("2024-01-01")]).is_none());
        assert!(MetricSeries::new(vec![row("2024-01-01"), row("2024-01-01")]).is_none());

        let s = MetricSeries::new(vec![row("2024-01-01"), row("2024-01-05")]).unwrap();
        assert_eq!(s.min_date().to_string(), "2024-01-01");
        assert_eq!(s.max_date().to_string(), "2024-01-05");
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("views".parse::<Metric>().unwrap(), Metric::Views);
        assert_eq!("watch-hours".parse::<Metric>().unwrap(), Metric::WatchHours);
        assert_eq!("subscribers".parse::<Metric>().unwrap(), Metric::NetSubscribers);
        assert!("dislikes".parse::<Metric>().is_err());
    }

    #[test]
    fn test_only_average_view_duration_is_mean() {
        let means: Vec<Metric> = Metric::ALL
            .into_iter()
            .filter(|m| m.aggregation() == Aggregation::Mean)
            .collect();
        assert_eq!(means, vec![Metric::AverageViewDurationPercentage]);
    }
}
