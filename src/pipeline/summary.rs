//! Totals and period-over-period deltas for the key-metric cards.

use crate::models::{Metric, MetricValues};
use crate::pipeline::resample::PeriodBucket;
use serde::Serialize;

/// Sum every summed metric; average the mean metric over the values present.
pub fn aggregate<'a, I>(values: I) -> MetricValues
where
    I: IntoIterator<Item = &'a MetricValues>,
{
    let mut total = MetricValues::default();
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;

    for v in values {
        total.add_sums(v);
        if let Some(p) = v.average_view_duration_percentage {
            pct_sum += p;
            pct_count += 1;
        }
    }

    total.average_view_duration_percentage = (pct_count > 0).then(|| pct_sum / pct_count as f64);
    total
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodDelta {
    pub metric: Metric,
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    /// `None` when the previous period was zero.
    pub change_pct: Option<f64>,
}

/// Change of `metric` between the last two buckets.
pub fn period_delta(buckets: &[PeriodBucket], metric: Metric) -> Option<PeriodDelta> {
    let [.., prev, last] = buckets else {
        return None;
    };
    let current = last.values.get(metric)?;
    let previous = prev.values.get(metric)?;
    let change = current - previous;

    Some(PeriodDelta {
        metric,
        current,
        previous,
        change,
        change_pct: (previous != 0.0).then(|| change / previous.abs() * 100.0),
    })
}
