//! Running totals over the full daily series.

use crate::models::{Baseline, MetricSeries, MetricValues};
use crate::pipeline::summary::aggregate;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: MetricValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeSeries {
    /// Synthetic position 0, dated the day before the first tracked day.
    pub baseline: Option<CumulativePoint>,
    pub points: Vec<CumulativePoint>,
    /// `sum(series) + baseline`, kept apart from the running curve.
    pub grand_total: MetricValues,
}

/// Running sum of every summed metric in date order, seeded by `baseline`.
/// The average view duration column becomes an expanding mean.
pub fn cumulative(series: &MetricSeries, baseline: Option<&Baseline>) -> CumulativeSeries {
    let seed = baseline.map(Baseline::as_values).unwrap_or_default();

    let mut running = seed.clone();
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;

    let points = series
        .rows()
        .iter()
        .map(|row| {
            running.add_sums(&row.values);
            if let Some(p) = row.values.average_view_duration_percentage {
                pct_sum += p;
                pct_count += 1;
            }
            running.average_view_duration_percentage =
                (pct_count > 0).then(|| pct_sum / pct_count as f64);

            CumulativePoint { date: row.date, values: running.clone() }
        })
        .collect();

    let mut grand_total = aggregate(series.rows().iter().map(|r| &r.values));
    grand_total.add_sums(&seed);

    CumulativeSeries {
        baseline: baseline.map(|b| CumulativePoint {
            date: series.min_date().pred_opt().unwrap_or(series.min_date()),
            values: b.as_values(),
        }),
        points,
        grand_total,
    }
}
