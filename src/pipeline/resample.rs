//! Calendar bucketing of the daily series.

use crate::models::{MetricSeries, MetricValues, Period, PeriodKey};
use crate::pipeline::summary::aggregate;
use chrono::NaiveDate;
use serde::Serialize;

/// One aggregated period. Only periods with at least one row exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBucket {
    pub key: PeriodKey,
    pub values: MetricValues,
    /// Days that contributed to this bucket.
    pub rows: usize,
    /// The period had not fully elapsed when the report was built.
    pub incomplete: bool,
}

/// Group rows by `period` and aggregate each group, ascending by key.
/// `Period::Day` yields one bucket per row.
pub fn resample(series: &MetricSeries, period: Period) -> Vec<PeriodBucket> {
    // Rows are date-ascending and keys are monotone in date,
    // so each bucket is a contiguous run.
    series
        .rows()
        .chunk_by(|a, b| period.key_for(a.date) == period.key_for(b.date))
        .map(|group| PeriodBucket {
            key: period.key_for(group[0].date),
            values: aggregate(group.iter().map(|r| &r.values)),
            rows: group.len(),
            incomplete: false,
        })
        .collect()
}

/// Flag the last bucket when it is today's row, or its period ends on or after `today`.
pub fn annotate_incomplete(mut buckets: Vec<PeriodBucket>, today: NaiveDate) -> Vec<PeriodBucket> {
    if let Some(last) = buckets.last_mut() {
        last.incomplete = match last.key {
            PeriodKey::Day(date) => date == today,
            key => key.last_day() >= today,
        };
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricRow;
    use chrono::Days;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn series(start: &str, views: &[i64]) -> MetricSeries {
        let start = d(start);
        let rows = views
            .iter()
            .enumerate()
            .map(|(i, v)| MetricRow {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                values: MetricValues {
                    views: *v,
                    average_view_duration_percentage: Some(*v as f64),
                    ..Default::default()
                },
            })
            .collect();
        MetricSeries::new(rows).unwrap()
    }

    #[test]
    fn test_daily_is_lossless() {
        let s = series("2024-01-01", &[3, 1, 4, 1, 5, 9, 2, 6]);
        let buckets = resample(&s, Period::Day);

        assert_eq!(buckets.len(), s.len());
        let total: i64 = buckets.iter().map(|b| b.values.views).sum();
        let source: i64 = s.rows().iter().map(|r| r.values.views).sum();
        assert_eq!(total, source);
        assert!(buckets.iter().zip(s.rows()).all(|(b, r)| b.key == PeriodKey::Day(r.date)));
    }

    #[test]
    fn test_weekly_buckets_sum_their_days() {
        let s = series("2024-01-01", &[10, 20, 10, 20, 10, 20, 10, 20]);
        let buckets = resample(&s, Period::Week);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, PeriodKey::Week(d("2024-01-01")));
        assert_eq!(buckets[0].values.views, 100);
        assert_eq!(buckets[0].rows, 7);
        assert_eq!(buckets[1].key, PeriodKey::Week(d("2024-01-08")));
        assert_eq!(buckets[1].values.views, 20);

        let flagged = annotate_incomplete(buckets.clone(), d("2024-01-10"));
        assert!(!flagged[0].incomplete);
        assert!(flagged[1].incomplete);

        let flagged = annotate_incomplete(buckets, d("2024-01-15"));
        assert!(!flagged[1].incomplete);
    }

    #[test]
    fn test_buckets_are_sparse() {
        // 2024-01-01..03 and 2024-01-07..10: a three-day gap
        let mut rows = series("2024-01-01", &[1, 1, 1]).rows().to_vec();
        rows.extend(series("2024-01-07", &[1, 1, 1, 1]).rows().iter().cloned());
        let s = MetricSeries::new(rows).unwrap();

        assert_eq!(resample(&s, Period::Day).len(), 7);
        assert_eq!(resample(&s, Period::Week).len(), 2);

        // Jan and Mar only, nothing synthesized for Feb
        let mut rows = series("2024-01-30", &[1, 1]).rows().to_vec();
        rows.extend(series("2024-03-01", &[1]).rows().iter().cloned());
        let s = MetricSeries::new(rows).unwrap();
        let months: Vec<String> = resample(&s, Period::Month).iter().map(|b| b.key.label()).collect();
        assert_eq!(months, vec!["2024-01", "2024-03"]);
    }

    #[test]
    fn test_monthly_and_quarterly_boundaries() {
        // 2024-03-30 .. 2024-04-02
        let s = series("2024-03-30", &[1, 2, 3, 4]);

        let months = resample(&s, Period::Month);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].values.views, 3);
        assert_eq!(months[1].key, PeriodKey::Month(d("2024-04-01")));
        assert_eq!(months[1].values.views, 7);

        let quarters = resample(&s, Period::Quarter);
        assert_eq!(quarters[0].key, PeriodKey::Quarter { year: 2024, quarter: 1 });
        assert_eq!(quarters[1].key, PeriodKey::Quarter { year: 2024, quarter: 2 });
    }

    #[test]
    fn test_mean_column_averages_rows_in_bucket() {
        let s = series("2024-01-01", &[10, 20, 60]);
        let buckets = resample(&s, Period::Month);
        assert_eq!(buckets[0].values.average_view_duration_percentage, Some(30.0));
    }

    #[test]
    fn test_incomplete_day_is_only_today() {
        let s = series("2024-01-01", &[1, 1, 1]);
        let today = annotate_incomplete(resample(&s, Period::Day), d("2024-01-03"));
        assert!(today[2].incomplete);
        // a row dated after today is a finished day in the export, not a partial one
        let earlier = annotate_incomplete(resample(&s, Period::Day), d("2024-01-02"));
        assert!(!earlier[2].incomplete);
    }

    #[test]
    fn test_incomplete_month_and_quarter() {
        let s = series("2024-06-28", &[1, 1]);

        let months = annotate_incomplete(resample(&s, Period::Month), d("2024-06-30"));
        assert!(months[0].incomplete);
        let months = annotate_incomplete(resample(&s, Period::Month), d("2024-07-01"));
        assert!(!months[0].incomplete);

        let quarters = annotate_incomplete(resample(&s, Period::Quarter), d("2024-05-01"));
        assert!(quarters[0].incomplete);
        let quarters = annotate_incomplete(resample(&s, Period::Quarter), d("2024-07-01"));
        assert!(!quarters[0].incomplete);
    }

    #[test]
    fn test_daily_incomplete_only_for_today() {
        let s = series("2024-01-01", &[1, 1]);
        let days = annotate_incomplete(resample(&s, Period::Day), d("2024-01-02"));
        assert!(!days[0].incomplete);
        assert!(days[1].incomplete);
        let days = annotate_incomplete(resample(&s, Period::Day), d("2024-01-03"));
        assert!(!days[1].incomplete);
    }
}
