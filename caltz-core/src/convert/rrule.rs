use chrono::NaiveDateTime;

use super::{Reference, ZoneShift, skip_dates};
use crate::byday;
use crate::event::{EventTiming, RRuleEvent, RRuleStart, TimeRange};
use crate::time_of_day;

pub(super) fn convert(event: &RRuleEvent, range: &TimeRange, shift: &ZoneShift) -> RRuleEvent {
    let Some((start, reference)) = reference_of(event, range, shift) else {
        tracing::warn!(title = %event.common.title, start_time = %range.start_time, "unparseable start time, leaving series unchanged");
        return event.clone();
    };

    let start_date = match event.start_date {
        RRuleStart::Date(_) => RRuleStart::Date(reference.target.date_naive()),
        RRuleStart::DateTime(_) | RRuleStart::Instant(_) => {
            RRuleStart::DateTime(reference.target.naive_local())
        }
    };

    let end_time = range.end_time.as_deref().map(|text| match time_of_day::parse(text) {
        Some(end_time) => {
            let end_time = end_time.to_naive_time();
            let end_date = if end_time < start.time() {
                start.date().succ_opt().unwrap_or(start.date())
            } else {
                start.date()
            };
            time_of_day::format(shift.to_target(end_date.and_time(end_time)).time())
        }
        None => {
            tracing::warn!(title = %event.common.title, end_time = %text, "unparseable end time, keeping it as is");
            text.to_string()
        }
    });

    let rrule = if reference.day_offset == 0 {
        event.rrule.clone()
    } else {
        byday::shift_byday(&event.rrule, reference.day_offset).unwrap_or_else(|e| {
            tracing::warn!(title = %event.common.title, error = %e, "cannot remap BYDAY, keeping rule as is");
            event.rrule.clone()
        })
    };

    RRuleEvent {
        common: shift.retag(&event.common),
        start_date,
        rrule,
        skip_dates: skip_dates::translate(&event.skip_dates, start.time(), shift.source(), shift.target()),
        timing: EventTiming::Timed(TimeRange {
            start_time: time_of_day::format(reference.target.time()),
            end_time,
        }),
        explicit_start_time: event.explicit_start_time,
    }
}

/// The series start as source-zone wall clock, and the instant it denotes.
///
/// An embedded datetime is authoritative; a bare date is combined with `startTime`.
fn reference_of(
    event: &RRuleEvent,
    range: &TimeRange,
    shift: &ZoneShift,
) -> Option<(NaiveDateTime, Reference)> {
    match event.start_date {
        RRuleStart::Date(date) => {
            let start_time = time_of_day::parse(&range.start_time)?.to_naive_time();
            let start = date.and_time(start_time);
            Some((start, shift.reference(start)))
        }
        RRuleStart::DateTime(start) => Some((start, shift.reference(start))),
        RRuleStart::Instant(instant) => {
            let reference = shift.reference_at(instant.with_timezone(shift.source()));
            Some((reference.source.naive_local(), reference))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventCommon;
    use chrono::NaiveDate;

    fn rrule_event(start_date: &str, rule: &str, start: &str, end: Option<&str>) -> RRuleEvent {
        RRuleEvent {
            common: EventCommon {
                title: "Class".into(),
                timezone: Some("UTC".into()),
                ..Default::default()
            },
            start_date: RRuleStart::parse(start_date).unwrap(),
            rrule: rule.into(),
            skip_dates: vec![],
            timing: EventTiming::Timed(TimeRange {
                start_time: start.into(),
                end_time: end.map(Into::into),
            }),
            explicit_start_time: true,
        }
    }

    fn run(event: &RRuleEvent, source: &str, target: &str) -> RRuleEvent {
        let EventTiming::Timed(range) = &event.timing else {
            panic!("timed series expected");
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        convert(event, range, &ZoneShift::new(source, target, today).unwrap())
    }

    fn times(event: &RRuleEvent) -> (String, Option<String>) {
        match &event.timing {
            EventTiming::Timed(range) => (range.start_time.clone(), range.end_time.clone()),
            EventTiming::AllDay => panic!("timed series expected"),
        }
    }

    #[test]
    fn test_embedded_start_shifts_byday_backward() {
        let input = rrule_event("2025-06-02T01:00:00", "FREQ=WEEKLY;BYDAY=MO,WE", "01:00", None);
        let out = run(&input, "UTC", "America/New_York");

        assert_eq!(out.rrule, "FREQ=WEEKLY;BYDAY=SU,TU");
        assert_eq!(out.start_date.to_string(), "2025-06-01T21:00:00");
        assert_eq!(times(&out), ("21:00".into(), None));
        assert_eq!(out.common.timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn test_date_only_start_keeps_encoding() {
        let input = rrule_event(
            "2025-06-01",
            "FREQ=WEEKLY;UNTIL=20251231T235959Z;BYDAY=SU",
            "23:00",
            Some("23:45"),
        );
        let out = run(&input, "UTC", "Europe/Prague");

        assert_eq!(out.start_date.to_string(), "2025-06-02");
        assert_eq!(out.rrule, "FREQ=WEEKLY;UNTIL=20251231T235959Z;BYDAY=MO");
        assert_eq!(times(&out), ("01:00".into(), Some("01:45".into())));
    }

    #[test]
    fn test_end_time_crossing_midnight_in_source() {
        let input = rrule_event("2025-01-03", "FREQ=WEEKLY;BYDAY=FR", "22:00", Some("01:00"));
        let out = run(&input, "UTC", "Asia/Tokyo");

        assert_eq!(out.start_date.to_string(), "2025-01-04");
        assert_eq!(out.rrule, "FREQ=WEEKLY;BYDAY=SA");
        assert_eq!(times(&out), ("07:00".into(), Some("10:00".into())));
    }

    #[test]
    fn test_offset_start_is_absolute() {
        let input = rrule_event("2025-06-02T01:00:00+02:00", "FREQ=WEEKLY;BYDAY=MO", "01:00", None);
        let out = run(&input, "UTC", "UTC");

        // 01:00+02:00 is 23:00 UTC the day before
        assert_eq!(out.start_date.to_string(), "2025-06-01T23:00:00");
        assert_eq!(out.rrule, "FREQ=WEEKLY;BYDAY=MO");
    }

    #[test]
    fn test_invalid_rule_still_shifts_times() {
        let input = rrule_event("2025-06-02", "BYDAY=whenever", "01:00", None);
        let out = run(&input, "UTC", "America/New_York");

        assert_eq!(out.rrule, "BYDAY=whenever");
        assert_eq!(out.start_date.to_string(), "2025-06-01");
        assert_eq!(times(&out), ("21:00".into(), None));
    }

    #[test]
    fn test_skip_dates_anchor_at_series_time() {
        let mut input = rrule_event("2025-06-02T01:00:00", "FREQ=WEEKLY;BYDAY=MO", "01:00", None);
        input.skip_dates = vec!["2025-06-09".into(), "2025-06-16".into()];
        let out = run(&input, "UTC", "America/New_York");

        assert_eq!(
            out.skip_dates,
            vec!["2025-06-08".to_string(), "2025-06-15".into()]
        );
    }

    #[test]
    fn test_unparseable_start_time_aborts_date_only() {
        let input = rrule_event("2025-06-02", "FREQ=WEEKLY;BYDAY=MO", "early", None);
        let out = run(&input, "UTC", "America/New_York");
        assert_eq!(out, input);
    }
}
