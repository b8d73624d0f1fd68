//! Plain-text rendering of reports for the terminal.

use crate::models::{Aggregation, Metric, MetricRow, MetricValues};
use crate::pipeline::{ChartView, DashboardReport, Notice};
use crate::utils::{fmt_change, fmt_decimal, fmt_number};
use serde::Serialize;
use std::fmt::Write;

/// One point of a single metric's chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: Option<f64>,
    pub incomplete: bool,
    pub baseline: bool,
}

pub fn series_points(report: &DashboardReport, metric: Metric) -> Vec<SeriesPoint> {
    match &report.chart {
        ChartView::Buckets { buckets } => buckets
            .iter()
            .map(|b| SeriesPoint {
                label: b.key.label(),
                value: b.values.get(metric),
                incomplete: b.incomplete,
                baseline: false,
            })
            .collect(),
        ChartView::Cumulative { series } => series
            .baseline
            .iter()
            .map(|p| (p, true))
            .chain(series.points.iter().map(|p| (p, false)))
            .map(|(p, baseline)| SeriesPoint {
                label: p.date.to_string(),
                value: p.values.get(metric),
                incomplete: false,
                baseline,
            })
            .collect(),
    }
}

pub fn fmt_metric(values: &MetricValues, metric: Metric) -> String {
    match (metric, values.get(metric)) {
        (_, None) => "—".to_string(),
        (Metric::WatchHours, Some(v)) => fmt_decimal(v, 1),
        (Metric::AverageViewDurationPercentage, Some(v)) => format!("{:.1}%", v),
        (_, Some(v)) => fmt_number(v as i64),
    }
}

fn period_noun(report: &DashboardReport) -> &'static str {
    use crate::models::Granularity::*;
    match report.granularity {
        Daily => "day",
        Weekly => "week",
        Monthly => "month",
        Quarterly => "quarter",
        Cumulative => "period",
    }
}

/// Key-metric cards: all-time total, range total and last-period change.
pub fn render_summary(report: &DashboardReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "─────────────────────────────────────────────────────────");
    let _ = writeln!(out, "  YouTube Channel Dashboard — {}", report.granularity);
    let _ = writeln!(out, "  Data     : {}", report.source_bounds);
    let _ = writeln!(out, "  Window   : {}", report.range);
    let _ = writeln!(out, "─────────────────────────────────────────────────────────");
    let _ = writeln!(out, "  {:<22} {:>14} {:>14}  {}", "Metric", "All-time", "In window", "Last change");

    for metric in Metric::ALL {
        let delta = report
            .deltas
            .iter()
            .find(|d| d.metric == metric)
            .map(|d| format!("{} vs previous {}", fmt_change(d.change, d.change_pct), period_noun(report)))
            .unwrap_or_default();
        let label = match metric.aggregation() {
            Aggregation::Sum => metric.label().to_string(),
            Aggregation::Mean => format!("{} (mean)", metric.label()),
        };
        let _ = writeln!(
            out,
            "  {:<22} {:>14} {:>14}  {}",
            label,
            fmt_metric(&report.all_time, metric),
            fmt_metric(&report.range_totals, metric),
            delta
        );
    }

    for notice in &report.notices {
        let _ = writeln!(out, "  ⚠ {}", render_notice(notice));
    }
    let _ = write!(out, "─────────────────────────────────────────────────────────");
    out
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::EmptyRange { start, end } => {
            format!("No data between {} and {}; showing zeros", start, end)
        }
        Notice::IncompletePeriod { label } => {
            format!("{} is an incomplete period; its values are still accumulating", label)
        }
    }
}

/// One metric's chart series, one line per point.
pub fn render_series(report: &DashboardReport, metric: Metric) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", metric.label(), report.granularity);

    match &report.chart {
        ChartView::Buckets { buckets } => {
            for b in buckets {
                let _ = writeln!(
                    out,
                    "  {:<12} {:>14}{}",
                    b.key.label(),
                    fmt_metric(&b.values, metric),
                    if b.incomplete { "  (incomplete)" } else { "" }
                );
            }
        }
        ChartView::Cumulative { series } => {
            if let Some(base) = &series.baseline {
                let _ = writeln!(out, "  {:<12} {:>14}  (baseline)", base.date, fmt_metric(&base.values, metric));
            }
            for p in &series.points {
                let _ = writeln!(out, "  {:<12} {:>14}", p.date, fmt_metric(&p.values, metric));
            }
            let _ = writeln!(out, "  {:<12} {:>14}", "Total", fmt_metric(&series.grand_total, metric));
        }
    }

    if report.chart.is_empty() {
        let _ = writeln!(out, "  (no data in window)");
    }
    out.trim_end().to_string()
}

fn table_header() -> String {
    let mut line = format!("{:<12}", "PERIOD");
    for m in Metric::ALL {
        let _ = write!(line, " {:>14}", abbreviate(m));
    }
    line
}

fn abbreviate(metric: Metric) -> &'static str {
    match metric {
        Metric::NetSubscribers => "NET_SUBS",
        Metric::SubscribersGained => "SUBS_GAINED",
        Metric::SubscribersLost => "SUBS_LOST",
        Metric::AverageViewDurationPercentage => "AVG_VIEW_PCT",
        other => other.column(),
    }
}

fn table_line(label: &str, values: &MetricValues) -> String {
    let mut line = format!("{:<12}", label);
    for m in Metric::ALL {
        let _ = write!(line, " {:>14}", fmt_metric(values, m));
    }
    line
}

/// The derived daily table for inspection.
pub fn render_rows(rows: &[MetricRow]) -> String {
    let mut out = table_header();
    for r in rows {
        out.push('\n');
        out.push_str(&table_line(&r.date.to_string(), &r.values));
    }
    out
}

/// The chart view as a table, all metrics side by side.
pub fn render_chart_table(report: &DashboardReport) -> String {
    let mut out = table_header();
    match &report.chart {
        ChartView::Buckets { buckets } => {
            for b in buckets {
                out.push('\n');
                out.push_str(&table_line(&b.key.label(), &b.values));
            }
        }
        ChartView::Cumulative { series } => {
            for p in series.baseline.iter().chain(&series.points) {
                out.push('\n');
                out.push_str(&table_line(&p.date.to_string(), &p.values));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Granularity, MetricSeries};
    use crate::pipeline::{Pipeline, ReportRequest};
    use chrono::NaiveDate;

    fn report(granularity: Granularity) -> DashboardReport {
        let rows = (1..=8)
            .map(|day| MetricRow {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                values: MetricValues {
                    views: 1000 * day as i64,
                    watch_hours: 12.25,
                    ..Default::default()
                },
            })
            .collect();
        let series = MetricSeries::new(rows).unwrap();
        let request = ReportRequest { granularity, ..Default::default() };
        Pipeline::new(request).run(&series, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
    }

    #[test]
    fn test_fmt_metric() {
        let v = MetricValues { views: 1234567, watch_hours: 1234.56, ..Default::default() };
        assert_eq!(fmt_metric(&v, Metric::Views), "1,234,567");
        assert_eq!(fmt_metric(&v, Metric::WatchHours), "1,234.6");
        assert_eq!(fmt_metric(&v, Metric::AverageViewDurationPercentage), "—");
    }

    #[test]
    fn test_summary_mentions_totals_and_incomplete_week() {
        let text = render_summary(&report(Granularity::Weekly));
        assert!(text.contains("36,000"));
        assert!(text.contains("2024-01-08 is an incomplete period"));
        assert!(text.contains("vs previous week"));
    }

    #[test]
    fn test_series_marks_incomplete_bucket() {
        let text = render_series(&report(Granularity::Weekly), Metric::Views);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("28,000"));
        assert!(lines[2].ends_with("(incomplete)"));
    }

    #[test]
    fn test_cumulative_series_has_total_line() {
        let text = render_series(&report(Granularity::Cumulative), Metric::Views);
        assert!(text.lines().last().unwrap().contains("36,000"));
    }

    #[test]
    fn test_series_points_include_baseline() {
        let mut r = report(Granularity::Cumulative);
        if let ChartView::Cumulative { series } = &mut r.chart {
            series.baseline = Some(crate::pipeline::cumulative::CumulativePoint {
                date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
                values: MetricValues::default(),
            });
        }
        let points = series_points(&r, Metric::Views);
        assert_eq!(points.len(), 9);
        assert!(points[0].baseline);
        assert_eq!(points[8].value, Some(36000.0));
    }

    #[test]
    fn test_chart_table_rows() {
        let text = render_chart_table(&report(Granularity::Monthly));
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("2024-01"));
    }
}
