//! Session-scoped cache of loaded series and the interactive report loop.

use crate::error::Result;
use crate::loader::{MetricSource, SourceId};
use crate::models::{Granularity, Metric, MetricSeries};
use crate::output::{render_series, render_summary};
use crate::pipeline::{load_series, DashboardReport, Pipeline, ReportRequest};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info};

// ── Cache ─────────────────────────────────────────────────────────────────────

/// Derived series keyed by source. Owned by one session; entries live until
/// invalidated or the session ends. Failed loads are not cached.
#[derive(Default)]
pub struct SessionCache {
    entries: HashMap<SourceId, Arc<MetricSeries>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, source: &dyn MetricSource) -> Result<Arc<MetricSeries>> {
        let id = source.id();
        if let Some(series) = self.entries.get(&id) {
            debug!("cache hit: {}", id);
            return Ok(Arc::clone(series));
        }

        let series = Arc::new(load_series(source)?);
        self.entries.insert(id, Arc::clone(&series));
        Ok(series)
    }

    /// Drop one source; the next `get_or_load` re-reads it.
    pub fn invalidate(&mut self, id: &SourceId) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

pub struct Session {
    source: Box<dyn MetricSource>,
    cache: SessionCache,
    request: ReportRequest,
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Granularity(Granularity),
    Start(Option<NaiveDate>),
    End(Option<NaiveDate>),
    Series(Metric),
    Show,
    Reload,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> std::result::Result<Self, String> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next();

        let date_arg = |arg: Option<&str>| -> std::result::Result<Option<NaiveDate>, String> {
            match arg {
                None | Some("-") => Ok(None),
                Some(s) => s
                    .parse::<NaiveDate>()
                    .map(Some)
                    .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s)),
            }
        };

        match (verb.as_str(), arg) {
            ("granularity" | "g", Some(g)) => g.parse().map(SessionCommand::Granularity),
            ("start", a) => date_arg(a).map(SessionCommand::Start),
            ("end", a) => date_arg(a).map(SessionCommand::End),
            ("series", Some(m)) => m.parse().map(SessionCommand::Series),
            ("show" | "", _) => Ok(SessionCommand::Show),
            ("reload", _) => Ok(SessionCommand::Reload),
            ("help" | "?", _) => Ok(SessionCommand::Help),
            ("quit" | "exit" | "q", _) => Ok(SessionCommand::Quit),
            _ => Err(format!("unrecognised command '{}' (try 'help')", line.trim())),
        }
    }
}

const HELP: &str = "\
commands:
  granularity <daily|weekly|monthly|quarterly|cumulative>
  start <YYYY-MM-DD|->     end <YYYY-MM-DD|->
  series <metric>          show
  reload                   quit";

impl Session {
    pub fn new(source: Box<dyn MetricSource>, request: ReportRequest) -> Self {
        Self { source, cache: SessionCache::new(), request }
    }

    pub fn request(&self) -> &ReportRequest {
        &self.request
    }

    /// Full pipeline pass over the cached series.
    pub fn report(&mut self, today: NaiveDate) -> Result<DashboardReport> {
        let series = self.cache.get_or_load(self.source.as_ref())?;
        Ok(Pipeline::new(self.request.clone()).run(&series, today))
    }

    pub fn reload(&mut self) {
        let id = self.source.id();
        if self.cache.invalidate(&id) {
            info!("{} invalidated; re-reading on next report ({} sources cached)", id, self.cache.len());
        }
    }

    /// Read commands until EOF or `quit`, re-rendering after every change.
    /// A source failure ends the session.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W, today: NaiveDate) -> anyhow::Result<()> {
        writeln!(out, "{}", render_summary(&self.report(today)?))?;

        for line in input.lines() {
            let line = line?;
            let cmd = match SessionCommand::parse(&line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    continue;
                }
            };

            match cmd {
                SessionCommand::Granularity(g) => self.request.granularity = g,
                SessionCommand::Start(d) => self.request.start = d,
                SessionCommand::End(d) => self.request.end = d,
                SessionCommand::Reload => self.reload(),
                SessionCommand::Show => {}
                SessionCommand::Series(metric) => {
                    writeln!(out, "{}", render_series(&self.report(today)?, metric))?;
                    continue;
                }
                SessionCommand::Help => {
                    writeln!(out, "{}", HELP)?;
                    continue;
                }
                SessionCommand::Quit => break,
            }

            writeln!(out, "{}", render_summary(&self.report(today)?))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::models::{SourceRow, SourceTable, WatchUnit};
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingSource {
        loads: Rc<Cell<usize>>,
        fail: bool,
    }

    impl MetricSource for CountingSource {
        fn id(&self) -> SourceId {
            SourceId::Csv("counting.csv".into())
        }

        fn load(&self) -> Result<SourceTable> {
            self.loads.set(self.loads.get() + 1);
            if self.fail {
                return Err(DashboardError::unavailable("offline"));
            }
            let rows = (1..=10)
                .map(|day| SourceRow {
                    date: format!("2024-01-{:02}", day),
                    views: 10,
                    ..Default::default()
                })
                .collect();
            Ok(SourceTable { watch_unit: WatchUnit::Hours, rows })
        }
    }

    fn counting(fail: bool) -> (CountingSource, Rc<Cell<usize>>) {
        let loads = Rc::new(Cell::new(0));
        (CountingSource { loads: Rc::clone(&loads), fail }, loads)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_cache_loads_once_until_invalidated() {
        let (source, loads) = counting(false);
        let mut cache = SessionCache::new();

        let a = cache.get_or_load(&source).unwrap();
        let b = cache.get_or_load(&source).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.get(), 1);

        assert!(cache.invalidate(&source.id()));
        assert!(!cache.invalidate(&source.id()));
        cache.get_or_load(&source).unwrap();
        assert_eq!(loads.get(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let (source, loads) = counting(true);
        let mut cache = SessionCache::new();

        assert!(cache.get_or_load(&source).is_err());
        assert_eq!(cache.len(), 0);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            SessionCommand::parse("granularity monthly"),
            Ok(SessionCommand::Granularity(Granularity::Monthly))
        );
        assert_eq!(
            SessionCommand::parse("start 2024-01-05"),
            Ok(SessionCommand::Start(NaiveDate::from_ymd_opt(2024, 1, 5)))
        );
        assert_eq!(SessionCommand::parse("end -"), Ok(SessionCommand::End(None)));
        assert_eq!(SessionCommand::parse("series views"), Ok(SessionCommand::Series(Metric::Views)));
        assert_eq!(SessionCommand::parse(""), Ok(SessionCommand::Show));
        assert!(SessionCommand::parse("start yesterday").is_err());
        assert!(SessionCommand::parse("granularity hourly").is_err());
        assert!(SessionCommand::parse("dance").is_err());
    }

    #[test]
    fn test_interactive_run_reuses_cached_series() {
        let (source, loads) = counting(false);
        let mut session = Session::new(Box::new(source), ReportRequest::default());

        let input = "granularity weekly\nstart 2024-01-08\nbogus\nseries views\nreload\nquit\nshow\n";
        let mut out = Vec::new();
        session.run(input.as_bytes(), &mut out, today()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("unrecognised command 'bogus'"));
        assert!(text.contains("Views (weekly)"));
        assert_eq!(session.request().granularity, Granularity::Weekly);
        // initial load, then one more after `reload`
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn test_source_failure_ends_session() {
        let (source, _) = counting(true);
        let mut session = Session::new(Box::new(source), ReportRequest::default());
        let mut out = Vec::new();
        assert!(session.run("show\n".as_bytes(), &mut out, today()).is_err());
    }
}
