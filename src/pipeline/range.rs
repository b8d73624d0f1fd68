use crate::models::{DateRange, MetricRow, PeriodKey};
use crate::pipeline::cumulative::CumulativePoint;
use crate::pipeline::resample::PeriodBucket;

/// Anything positioned on the calendar by a period key.
pub trait Periodic {
    fn period_key(&self) -> PeriodKey;
}

impl Periodic for MetricRow {
    fn period_key(&self) -> PeriodKey {
        PeriodKey::Day(self.date)
    }
}

impl Periodic for PeriodBucket {
    fn period_key(&self) -> PeriodKey {
        self.key
    }
}

impl Periodic for CumulativePoint {
    fn period_key(&self) -> PeriodKey {
        PeriodKey::Day(self.date)
    }
}

/// Keep items whose period overlaps `range`, inclusive.
/// An inverted range yields an empty result.
pub fn filter_range<T: Periodic + Clone>(items: &[T], range: &DateRange) -> Vec<T> {
    items
        .iter()
        .filter(|item| range.contains_key(&item.period_key()))
        .cloned()
        .collect()
}
