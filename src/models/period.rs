//! Calendar periods: granularity selection, bucket keys and date ranges.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Granularity ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Cumulative,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Cumulative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Cumulative => "cumulative",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown granularity '{}' (expected daily, weekly, monthly, quarterly or cumulative)", s))
    }
}

// ── Period / PeriodKey ────────────────────────────────────────────────────────

/// Bucketing resolution of the resampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Day,
    Week,
    Month,
    Quarter,
}

impl Period {
    pub fn key_for(self, date: NaiveDate) -> PeriodKey {
        match self {
            Period::Day => PeriodKey::Day(date),
            Period::Week => PeriodKey::Week(week_start(date)),
            Period::Month => PeriodKey::Month(month_start(date)),
            Period::Quarter => PeriodKey::quarter_of(date),
        }
    }
}

/// Identifies one bucket. Keys of the same kind order chronologically;
/// a series never mixes kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeriodKey {
    Day(NaiveDate),
    /// Monday of the ISO week.
    Week(NaiveDate),
    /// First day of the month.
    Month(NaiveDate),
    Quarter { year: i32, quarter: u32 },
}

impl PeriodKey {
    pub fn quarter_of(date: NaiveDate) -> Self {
        PeriodKey::Quarter {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        match *self {
            PeriodKey::Day(d) | PeriodKey::Week(d) | PeriodKey::Month(d) => d,
            PeriodKey::Quarter { year, quarter } => {
                NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1).unwrap_or(NaiveDate::MIN)
            }
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        let first = self.first_day();
        let next_start = match self {
            PeriodKey::Day(_) => first.checked_add_days(Days::new(1)),
            PeriodKey::Week(_) => first.checked_add_days(Days::new(7)),
            PeriodKey::Month(_) => first.checked_add_months(Months::new(1)),
            PeriodKey::Quarter { .. } => first.checked_add_months(Months::new(3)),
        };
        next_start.and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX)
    }

    pub fn label(&self) -> String {
        match self {
            PeriodKey::Day(d) | PeriodKey::Week(d) => d.format("%Y-%m-%d").to_string(),
            PeriodKey::Month(d) => d.format("%Y-%m").to_string(),
            PeriodKey::Quarter { year, quarter } => format!("{} Q{}", year, quarter),
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive `[start, end]` display window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Missing endpoints default to `bounds`; supplied ones are clamped into it.
    /// An inverted request stays inverted.
    pub fn clamped(start: Option<NaiveDate>, end: Option<NaiveDate>, bounds: DateRange) -> Self {
        let clamp = |d: NaiveDate| d.clamp(bounds.start, bounds.end);
        Self {
            start: start.map(clamp).unwrap_or(bounds.start),
            end: end.map(clamp).unwrap_or(bounds.end),
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// True when the key's period `[first_day, last_day]` overlaps the range.
    /// A day key is its own period, so days compare by date.
    pub fn contains_key(&self, key: &PeriodKey) -> bool {
        !self.is_inverted() && key.first_day() <= self.end && self.start <= key.last_day()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}
