//! Report pipeline: ties loader → derive → resample | cumulative → range filter.
//!
//! ## Passes
//!
//! `load_series()` runs once per session and is cached by the caller.
//!
//! `Pipeline::run()` is the per-interaction pass. It is cheap and fully
//! synchronous, so it is re-run from scratch whenever the granularity or the
//! date window changes:
//!   1. Clamp the requested window into the series bounds
//!   2. Resample (daily/weekly/monthly/quarterly) or accumulate (cumulative)
//!   3. Restrict the chart view to the window, collect totals and notices

pub mod cumulative;
pub mod derive;
pub mod range;
pub mod resample;
pub mod summary;

use crate::error::Result;
use crate::loader::MetricSource;
use crate::models::{Baseline, DateRange, Granularity, Metric, MetricSeries, MetricValues, Period};
use crate::utils::Timer;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use self::cumulative::{cumulative, CumulativeSeries};
use self::derive::derive;
use self::range::filter_range;
use self::resample::{annotate_incomplete, resample, PeriodBucket};
use self::summary::{aggregate, period_delta, PeriodDelta};

/// Read a source once and derive the typed daily series.
pub fn load_series(source: &dyn MetricSource) -> Result<MetricSeries> {
    let _t = Timer::start(format!("load {}", source.id()));
    let table = source.load()?;
    let series = derive(&table)?;
    info!(
        "{}: {} days ({} → {})",
        source.id(),
        series.len(),
        series.min_date(),
        series.max_date()
    );
    Ok(series)
}

// ── Request / report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRequest {
    pub granularity: Granularity,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub baseline: Option<Baseline>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartView {
    Buckets { buckets: Vec<PeriodBucket> },
    Cumulative { series: CumulativeSeries },
}

impl ChartView {
    pub fn len(&self) -> usize {
        match self {
            ChartView::Buckets { buckets } => buckets.len(),
            ChartView::Cumulative { series } => series.points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-fatal conditions surfaced next to the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The window selected no rows; totals are zero.
    EmptyRange { start: NaiveDate, end: NaiveDate },
    /// The latest bucket covers a period that has not finished yet.
    IncompletePeriod { label: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub granularity: Granularity,
    pub range: DateRange,
    pub source_bounds: DateRange,
    /// Whole-series totals, baseline included when configured.
    pub all_time: MetricValues,
    /// Totals of what the chart shows for `range`.
    pub range_totals: MetricValues,
    /// Last period against the one before, resampled views only.
    pub deltas: Vec<PeriodDelta>,
    pub chart: ChartView,
    pub notices: Vec<Notice>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline {
    request: ReportRequest,
}

impl Pipeline {
    pub fn new(request: ReportRequest) -> Self {
        Self { request }
    }

    pub fn run(&self, series: &MetricSeries, today: NaiveDate) -> DashboardReport {
        let req = &self.request;
        let range = DateRange::clamped(req.start, req.end, series.bounds());
        debug!("{} report over {}", req.granularity, range);

        let mut all_time = aggregate(series.rows().iter().map(|r| &r.values));
        if let Some(b) = &req.baseline {
            all_time.add_sums(&b.as_values());
        }

        let (chart, range_totals, deltas) = match req.granularity {
            Granularity::Daily => self.resampled(series, Period::Day, &range, today),
            Granularity::Weekly => self.resampled(series, Period::Week, &range, today),
            Granularity::Monthly => self.resampled(series, Period::Month, &range, today),
            Granularity::Quarterly => self.resampled(series, Period::Quarter, &range, today),
            Granularity::Cumulative => self.accumulated(series, &range),
        };

        let mut notices = Vec::new();
        if chart.is_empty() {
            warn!("No rows between {} and {}", range.start, range.end);
            notices.push(Notice::EmptyRange { start: range.start, end: range.end });
        }
        if let ChartView::Buckets { buckets } = &chart {
            if let Some(last) = buckets.last().filter(|b| b.incomplete) {
                notices.push(Notice::IncompletePeriod { label: last.key.label() });
            }
        }

        DashboardReport {
            granularity: req.granularity,
            range,
            source_bounds: series.bounds(),
            all_time,
            range_totals,
            deltas,
            chart,
            notices,
        }
    }

    fn resampled(
        &self,
        series: &MetricSeries,
        period: Period,
        range: &DateRange,
        today: NaiveDate,
    ) -> (ChartView, MetricValues, Vec<PeriodDelta>) {
        let buckets = annotate_incomplete(resample(series, period), today);
        let deltas = Metric::ALL
            .into_iter()
            .filter_map(|m| period_delta(&buckets, m))
            .collect();

        let shown = filter_range(&buckets, range);
        let totals = aggregate(shown.iter().map(|b| &b.values));
        // A bucket's mean must be re-averaged from its days, not from bucket means.
        let totals = MetricValues {
            average_view_duration_percentage: mean_of_days(series, period, &shown),
            ..totals
        };

        (ChartView::Buckets { buckets: shown }, totals, deltas)
    }

    fn accumulated(
        &self,
        series: &MetricSeries,
        range: &DateRange,
    ) -> (ChartView, MetricValues, Vec<PeriodDelta>) {
        let full = cumulative(series, self.request.baseline.as_ref());
        let days = filter_range(series.rows(), range);
        let totals = aggregate(days.iter().map(|r| &r.values));

        // The baseline point sits before the first day; only a window opening there shows it.
        let baseline = full.baseline.filter(|_| range.start == series.min_date());
        let shown = CumulativeSeries {
            points: filter_range(&full.points, range),
            baseline,
            ..full
        };
        (ChartView::Cumulative { series: shown }, totals, Vec::new())
    }
}

fn mean_of_days(series: &MetricSeries, period: Period, shown: &[PeriodBucket]) -> Option<f64> {
    let keys: Vec<_> = shown.iter().map(|b| b.key).collect();
    let days = series
        .rows()
        .iter()
        .filter(|r| keys.binary_search(&period.key_for(r.date)).is_ok());
    aggregate(days.map(|r| &r.values)).average_view_duration_percentage
}
