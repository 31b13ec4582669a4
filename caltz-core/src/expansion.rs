//! Render-time recurrence expansion with per-occurrence timezone correction.
//!
//! The rendering layer turns a recurring series into concrete occurrences through an
//! [`ExpansionHost`]. Its stock expander treats the series' wall-clock start as a floating
//! value, so every occurrence carries the source-zone clock reading rather than the
//! display-zone one. [`PerOccurrenceAdapter`] wraps that expander and recomputes each
//! occurrence from its date, the series' wall-clock time and the source zone, which keeps
//! long-running weekly series right on both sides of a DST transition.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::byday;
use crate::error::{CalTzError, CalTzResult};
use crate::event::{CalendarEvent, DayCode, EventTiming, RRuleStart};
use crate::time_of_day;
use crate::zone::{self, localize};

/// Upper bound on the occurrences produced for one framing range.
const MAX_OCCURRENCES: u16 = 1000;

/// A recurring series as the expander sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringSeries {
    /// Rule bodies (`FREQ=...`), without the `RRULE:` prefix.
    pub rules: Vec<String>,
    /// Wall-clock start in `zone`.
    pub start: NaiveDateTime,
    pub zone: Tz,
    pub all_day: bool,
    /// Dates whose occurrence is removed from the series.
    pub exdates: Vec<NaiveDate>,
}

impl RecurringSeries {
    /// Build the series for a recurring event.
    ///
    /// `default_zone` applies when the event carries no `timezone`. A `daysOfWeek` series
    /// without `startRecur` is anchored on its last weekday before `since`, so occurrences
    /// of the previous source-zone day stay visible once re-zoned.
    pub fn from_event(event: &CalendarEvent, default_zone: &str, since: NaiveDate) -> CalTzResult<Self> {
        let zone = zone::resolve(event.timezone().unwrap_or(default_zone))?;
        let (all_day, start_time) = match event.timing() {
            EventTiming::AllDay => (true, NaiveTime::MIN),
            EventTiming::Timed(range) => {
                let start_time = time_of_day::parse(&range.start_time)
                    .ok_or_else(|| CalTzError::InvalidTime(range.start_time.clone()))?;
                (false, start_time.to_naive_time())
            }
        };

        match event {
            CalendarEvent::Single(_) => Err(CalTzError::InvalidEvent(format!(
                "'{}' is not a recurring event",
                event.title()
            ))),
            CalendarEvent::Recurring(recurring) => {
                if recurring.days_of_week.is_empty() {
                    return Err(CalTzError::InvalidEvent(format!(
                        "'{}' recurs on no weekday",
                        event.title()
                    )));
                }

                let days = recurring
                    .days_of_week
                    .iter()
                    .map(|day| day.rrule_token())
                    .collect::<Vec<_>>()
                    .join(",");
                let mut rule = format!("FREQ=WEEKLY;BYDAY={days}");
                if let Some(end_recur) = recurring.end_recur {
                    rule.push_str(&format!(";UNTIL={}T235959Z", end_recur.format("%Y%m%d")));
                }

                let anchor = recurring
                    .start_recur
                    .unwrap_or_else(|| anchor_before(since, &recurring.days_of_week));

                Ok(RecurringSeries {
                    rules: vec![rule],
                    start: anchor.and_time(start_time),
                    zone,
                    all_day,
                    exdates: parse_exdates(&recurring.skip_dates),
                })
            }
            CalendarEvent::RRule(rrule) => {
                let start = match rrule.start_date {
                    RRuleStart::Date(date) => date.and_time(start_time),
                    RRuleStart::DateTime(datetime) if all_day => datetime.date().and_time(NaiveTime::MIN),
                    RRuleStart::DateTime(datetime) => datetime,
                    RRuleStart::Instant(instant) => instant.with_timezone(&zone).naive_local(),
                };

                let rules = rrule
                    .rrule
                    .lines()
                    .filter_map(|line| byday::rule_body(line.trim()).map(|(_, body)| body.to_string()))
                    .collect::<Vec<_>>();
                if rules.is_empty() {
                    return Err(CalTzError::InvalidRRule(rrule.rrule.clone()));
                }

                Ok(RecurringSeries {
                    rules,
                    start,
                    zone,
                    all_day,
                    exdates: parse_exdates(&rrule.skip_dates),
                })
            }
        }
    }
}

/// The latest date before `since` that falls on one of `days`.
fn anchor_before(since: NaiveDate, days: &[DayCode]) -> NaiveDate {
    (1..=7)
        .map(|back| since - Duration::days(back))
        .find(|date| days.contains(&DayCode::from(date.weekday())))
        .unwrap_or(since - Duration::days(1))
}

fn parse_exdates(dates: &[String]) -> Vec<NaiveDate> {
    dates
        .iter()
        .filter_map(|text| match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::warn!(date = %text, error = %e, "ignoring invalid skip date");
                None
            }
        })
        .collect()
}

/// The half-open marker range `[start, end)` the rendering layer asks to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl FramingRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        FramingRange { start, end }
    }

    /// Whole days from `start` up to, not including, `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        FramingRange {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, marker: &NaiveDateTime) -> bool {
        self.start <= *marker && *marker < self.end
    }

    fn widen(&self, by: Duration) -> Self {
        FramingRange {
            start: self.start - by,
            end: self.end + by,
        }
    }
}

/// The rendering layer's date environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateEnv {
    pub display_zone: Tz,
}

impl DateEnv {
    pub fn new(display_zone: Tz) -> Self {
        DateEnv { display_zone }
    }

    /// The display-zone wall clock of an instant.
    pub fn create_marker(&self, epoch: DateTime<Utc>) -> NaiveDateTime {
        epoch.with_timezone(&self.display_zone).naive_local()
    }
}

/// Turns a series into occurrence markers within a framing range.
pub trait RecurrenceExpander: Send + Sync {
    fn expand(
        &self,
        series: &RecurringSeries,
        range: &FramingRange,
        env: &DateEnv,
    ) -> CalTzResult<Vec<NaiveDateTime>>;
}

/// The rendering layer whose expansion gets patched.
pub trait ExpansionHost {
    fn expander(&self) -> Arc<dyn RecurrenceExpander>;

    fn set_expander(&mut self, expander: Arc<dyn RecurrenceExpander>);

    fn date_env(&self) -> &DateEnv;

    fn set_display_zone(&mut self, zone: Tz);
}

/// Expander built on the `rrule` crate.
///
/// Like most rendering libraries it takes the series start as a floating time: markers
/// carry the source-zone wall clock and ignore both the source and the display zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RRuleExpander;

impl RRuleExpander {
    fn build_rrule_string(series: &RecurringSeries) -> String {
        let mut lines = vec![format!("DTSTART:{}Z", series.start.format("%Y%m%dT%H%M%S"))];

        for rule in &series.rules {
            lines.push(format!("RRULE:{rule}"));
        }

        let wall_clock = series.start.time();
        for exdate in &series.exdates {
            lines.push(format!(
                "EXDATE:{}Z",
                exdate.and_time(wall_clock).format("%Y%m%dT%H%M%S")
            ));
        }

        lines.join("\n")
    }
}

impl RecurrenceExpander for RRuleExpander {
    fn expand(
        &self,
        series: &RecurringSeries,
        range: &FramingRange,
        _env: &DateEnv,
    ) -> CalTzResult<Vec<NaiveDateTime>> {
        let rrule_set: RRuleSet = Self::build_rrule_string(series)
            .parse()
            .map_err(|e| CalTzError::InvalidRRule(format!("{}: {e}", series.rules.join(" / "))))?;

        // after/before are exclusive, step one second outside the range start
        let tz: rrule::Tz = Utc.into();
        let after = (range.start.and_utc() - Duration::seconds(1)).with_timezone(&tz);
        let before = range.end.and_utc().with_timezone(&tz);

        let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
        if result.limited {
            tracing::warn!(limit = MAX_OCCURRENCES, "occurrence limit reached, series truncated");
        }

        Ok(result
            .dates
            .iter()
            .map(|occurrence| occurrence.naive_utc())
            .filter(|marker| range.contains(marker))
            .collect())
    }
}

/// A host holding one expander and a date environment.
#[derive(Clone)]
pub struct RenderHost {
    expander: Arc<dyn RecurrenceExpander>,
    date_env: DateEnv,
}

impl RenderHost {
    /// A host backed by the stock [`RRuleExpander`].
    pub fn new(display_zone: Tz) -> Self {
        RenderHost {
            expander: Arc::new(RRuleExpander),
            date_env: DateEnv::new(display_zone),
        }
    }

    pub fn expand(&self, series: &RecurringSeries, range: &FramingRange) -> CalTzResult<Vec<NaiveDateTime>> {
        self.expander.expand(series, range, &self.date_env)
    }
}

impl ExpansionHost for RenderHost {
    fn expander(&self) -> Arc<dyn RecurrenceExpander> {
        Arc::clone(&self.expander)
    }

    fn set_expander(&mut self, expander: Arc<dyn RecurrenceExpander>) {
        self.expander = expander;
    }

    fn date_env(&self) -> &DateEnv {
        &self.date_env
    }

    fn set_display_zone(&mut self, zone: Tz) {
        self.date_env.display_zone = zone;
    }
}

/// Wraps a host's expander with per-occurrence correction.
///
/// The unpatched expander is captured on the first [`install`](Self::install) and kept for
/// the adapter's lifetime. Later installs wrap that same original, never a corrected one.
#[derive(Default)]
pub struct PerOccurrenceAdapter {
    original: OnceLock<Arc<dyn RecurrenceExpander>>,
}

impl PerOccurrenceAdapter {
    pub const fn new() -> Self {
        PerOccurrenceAdapter {
            original: OnceLock::new(),
        }
    }

    pub fn install(&self, host: &mut dyn ExpansionHost) {
        let original = self.original.get_or_init(|| host.expander());
        host.set_expander(Arc::new(CorrectingExpander {
            original: Arc::clone(original),
        }));
    }

    pub fn is_installed(&self) -> bool {
        self.original.get().is_some()
    }
}

struct CorrectingExpander {
    original: Arc<dyn RecurrenceExpander>,
}

impl RecurrenceExpander for CorrectingExpander {
    fn expand(
        &self,
        series: &RecurringSeries,
        range: &FramingRange,
        env: &DateEnv,
    ) -> CalTzResult<Vec<NaiveDateTime>> {
        if series.all_day {
            return self.original.expand(series, range, env);
        }

        let wall_clock = series.start.time();
        let raw = self.original.expand(series, &range.widen(Duration::days(1)), env)?;

        let mut markers = raw
            .into_iter()
            .map(|occurrence| {
                let instant = localize(&series.zone, occurrence.date().and_time(wall_clock));
                env.create_marker(instant.with_timezone(&Utc))
            })
            .filter(|marker| range.contains(marker))
            .collect::<Vec<_>>();

        markers.sort();
        markers.dedup();
        Ok(markers)
    }
}

static ADAPTER: PerOccurrenceAdapter = PerOccurrenceAdapter::new();

/// Point `host` at `display_zone` and install the process-wide adapter on it.
pub fn patch_expansion(host: &mut dyn ExpansionHost, display_zone: &str) -> CalTzResult<()> {
    let zone = zone::resolve(display_zone)?;
    host.set_display_zone(zone);

    if ADAPTER.is_installed() {
        tracing::debug!(zone = %zone.name(), "expansion adapter already captured, re-applying");
    }
    ADAPTER.install(host);

    Ok(())
}
