use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;

use super::ZoneShift;
use crate::event::{EventTiming, SingleEvent, TimeRange};
use crate::time_of_day;
use crate::zone::localize;

/// Length assumed when the end time is missing or unparseable.
fn default_duration() -> Duration {
    Duration::hours(1)
}

pub(super) fn convert(event: &SingleEvent, range: &TimeRange, shift: &ZoneShift) -> SingleEvent {
    let Some(start_time) = time_of_day::parse(&range.start_time) else {
        tracing::warn!(title = %event.common.title, start_time = %range.start_time, "unparseable start time, leaving event unchanged");
        return event.clone();
    };
    let start_time = start_time.to_naive_time();
    let start = localize(shift.source(), event.date.and_time(start_time));

    let parsed_end = range
        .end_time
        .as_deref()
        .map(|text| (text, time_of_day::parse(text)));

    let end = match parsed_end {
        Some((_, Some(end_time))) => {
            let end_time = end_time.to_naive_time();
            let end_date = event.end_date.unwrap_or(event.date);
            let end = localize(shift.source(), end_date.and_time(end_time));

            if event.end_date.is_none() && end < start {
                let next_day = end_date.succ_opt().unwrap_or(end_date);
                localize(shift.source(), next_day.and_time(end_time))
            } else {
                end
            }
        }
        Some((text, None)) => {
            tracing::warn!(title = %event.common.title, end_time = %text, "unparseable end time, assuming one hour");
            start + default_duration()
        }
        None => start + default_duration(),
    };

    let start = start.with_timezone(shift.target());
    let end = end.with_timezone(shift.target());

    let end_time = match parsed_end {
        Some((_, Some(_))) => Some(time_of_day::format(end.time())),
        Some((text, None)) => Some(text.to_string()),
        None => None,
    };

    SingleEvent {
        common: shift.retag(&event.common),
        date: start.date_naive(),
        end_date: end_date(&start, &end),
        timing: EventTiming::Timed(TimeRange {
            start_time: time_of_day::format(start.time()),
            end_time,
        }),
    }
}

/// `None` when the event starts and ends on the same day. An end at exactly midnight
/// is the exclusive end of the previous day.
fn end_date(start: &DateTime<Tz>, end: &DateTime<Tz>) -> Option<NaiveDate> {
    if start.date_naive() == end.date_naive() {
        return None;
    }

    if end.time() == NaiveTime::MIN {
        return Some((*end - Duration::milliseconds(1)).date_naive());
    }

    Some(end.date_naive())
}
