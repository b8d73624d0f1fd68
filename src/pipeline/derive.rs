use crate::error::{DashboardError, Result};
use crate::loader::cleaner::parse_date;
use crate::models::{MetricRow, MetricSeries, MetricValues, SourceTable, WatchUnit};
use std::collections::HashSet;
use tracing::debug;

/// Typed dates, net subscribers, watch time in hours, ascending date order.
pub fn derive(table: &SourceTable) -> Result<MetricSeries> {
    let mut seen = HashSet::with_capacity(table.rows.len());
    let mut rows = Vec::with_capacity(table.rows.len());

    for raw in &table.rows {
        let date = parse_date(&raw.date).ok_or_else(|| {
            DashboardError::unavailable(format!("malformed date {:?}", raw.date))
        })?;
        if !seen.insert(date) {
            return Err(DashboardError::unavailable(format!("duplicate date {}", date)));
        }

        let watch_hours = match table.watch_unit {
            WatchUnit::Hours => raw.watch_time,
            WatchUnit::Minutes => raw.watch_time / 60.0,
        };

        rows.push(MetricRow {
            date,
            values: MetricValues {
                net_subscribers: raw.subscribers_gained - raw.subscribers_lost,
                subscribers_gained: raw.subscribers_gained,
                subscribers_lost: raw.subscribers_lost,
                views: raw.views,
                watch_hours,
                likes: raw.likes,
                comments: raw.comments,
                shares: raw.shares,
                average_view_duration_percentage: raw.average_view_duration_percentage,
            },
        });
    }

    rows.sort_by_key(|r| r.date);
    debug!("derived {} rows", rows.len());

    MetricSeries::new(rows).ok_or_else(|| DashboardError::unavailable("table has no data rows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceRow;

    fn raw(date: &str, gained: i64, lost: i64, watch: f64) -> SourceRow {
        SourceRow {
            date: date.to_string(),
            subscribers_gained: gained,
            subscribers_lost: lost,
            watch_time: watch,
            ..Default::default()
        }
    }

    #[test]
    fn test_derive_net_and_sort() {
        let table = SourceTable {
            watch_unit: WatchUnit::Hours,
            rows: vec![raw("2024-01-03", 1, 4, 1.0), raw("2024-01-01", 10, 2, 2.0)],
        };
        let series = derive(&table).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.min_date().to_string(), "2024-01-01");
        assert_eq!(series.rows()[0].values.net_subscribers, 8);
        assert_eq!(series.rows()[1].values.net_subscribers, -3);
    }

    #[test]
    fn test_derive_minutes_to_hours() {
        let table = SourceTable {
            watch_unit: WatchUnit::Minutes,
            rows: vec![raw("2024-01-01", 0, 0, 90.0)],
        };
        assert_eq!(derive(&table).unwrap().rows()[0].values.watch_hours, 1.5);
    }

    #[test]
    fn test_malformed_or_duplicate_date_is_unavailable() {
        let table = SourceTable {
            watch_unit: WatchUnit::Hours,
            rows: vec![raw("yesterday", 0, 0, 0.0)],
        };
        assert!(matches!(derive(&table), Err(DashboardError::DataUnavailable(_))));

        let table = SourceTable {
            watch_unit: WatchUnit::Hours,
            rows: vec![raw("2024-01-01", 0, 0, 0.0), raw("01/01/2024", 0, 0, 0.0)],
        };
        let err = derive(&table).unwrap_err();
        assert!(err.to_string().contains("duplicate date 2024-01-01"));
    }

    #[test]
    fn test_empty_table_is_unavailable() {
        let table = SourceTable { watch_unit: WatchUnit::Hours, rows: vec![] };
        assert!(matches!(derive(&table), Err(DashboardError::DataUnavailable(_))));
    }
}
