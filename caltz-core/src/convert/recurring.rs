use super::{ZoneShift, skip_dates};
use crate::event::{EventTiming, RecurringEvent, TimeRange};
use crate::time_of_day;

pub(super) fn convert(event: &RecurringEvent, range: &TimeRange, shift: &ZoneShift) -> RecurringEvent {
    let Some(start_time) = time_of_day::parse(&range.start_time) else {
        tracing::warn!(title = %event.common.title, start_time = %range.start_time, "unparseable start time, leaving series unchanged");
        return event.clone();
    };
    let start_time = start_time.to_naive_time();

    // The series starts at startRecur; without one, today stands in for it.
    let reference_date = event.start_recur.unwrap_or(shift.today());
    let reference = shift.reference(reference_date.and_time(start_time));

    let end_time = range.end_time.as_deref().map(|text| match time_of_day::parse(text) {
        Some(end_time) => {
            let end_time = end_time.to_naive_time();
            let end_date = if end_time < start_time {
                reference_date.succ_opt().unwrap_or(reference_date)
            } else {
                reference_date
            };
            time_of_day::format(shift.to_target(end_date.and_time(end_time)).time())
        }
        None => {
            tracing::warn!(title = %event.common.title, end_time = %text, "unparseable end time, keeping it as is");
            text.to_string()
        }
    });

    let days_of_week = event
        .days_of_week
        .iter()
        .map(|day| day.shift(reference.day_offset))
        .collect();

    RecurringEvent {
        common: shift.retag(&event.common),
        days_of_week,
        start_recur: event.start_recur,
        end_recur: event.end_recur,
        skip_dates: skip_dates::translate(&event.skip_dates, start_time, shift.source(), shift.target()),
        timing: EventTiming::Timed(TimeRange {
            start_time: time_of_day::format(reference.target.time()),
            end_time,
        }),
    }
}
