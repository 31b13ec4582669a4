//! Re-expressing events in another timezone.
//!
//! All conversions are pure: the input event is never modified and a new event
//! tagged with the target zone is returned. All-day events are timezone-invariant
//! and come back as an identical copy. Failures never escape: an event that cannot
//! be converted is returned unchanged and a warning is logged.

mod recurring;
mod rrule;
mod single;
pub mod skip_dates;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use crate::error::CalTzResult;
use crate::event::{CalendarEvent, EventCommon, EventTiming};
use crate::zone::{self, day_offset, localize};

/// Convert `event` from `source` to `target`.
///
/// `today` is the reference date for weekly series without a `startRecur`.
pub fn convert(event: &CalendarEvent, source: &str, target: &str, today: NaiveDate) -> CalendarEvent {
    match ZoneShift::new(source, target, today) {
        Ok(shift) => shift.apply(event),
        Err(e) => {
            tracing::warn!(title = %event.title(), error = %e, "cannot convert event, leaving it unchanged");
            event.clone()
        }
    }
}

/// A resolved source/target zone pair plus the reference date for weekly series.
#[derive(Debug, Clone, Copy)]
pub struct ZoneShift {
    source: Tz,
    target: Tz,
    today: NaiveDate,
}

/// One instant seen from both zones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reference {
    pub source: DateTime<Tz>,
    pub target: DateTime<Tz>,
    pub day_offset: i64,
}

impl ZoneShift {
    pub fn new(source: &str, target: &str, today: NaiveDate) -> CalTzResult<Self> {
        Ok(Self::between(zone::resolve(source)?, zone::resolve(target)?, today))
    }

    pub fn between(source: Tz, target: Tz, today: NaiveDate) -> Self {
        ZoneShift {
            source,
            target,
            today,
        }
    }

    pub fn source(&self) -> &Tz {
        &self.source
    }

    pub fn target(&self) -> &Tz {
        &self.target
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Convert one event. Dispatches on variant and all-day flag.
    pub fn apply(&self, event: &CalendarEvent) -> CalendarEvent {
        match (event, event.timing()) {
            (_, EventTiming::AllDay) => event.clone(),
            (CalendarEvent::Single(single), EventTiming::Timed(range)) => {
                CalendarEvent::Single(single::convert(single, range, self))
            }
            (CalendarEvent::Recurring(recurring), EventTiming::Timed(range)) => {
                CalendarEvent::Recurring(recurring::convert(recurring, range, self))
            }
            (CalendarEvent::RRule(rrule), EventTiming::Timed(range)) => {
                CalendarEvent::RRule(rrule::convert(rrule, range, self))
            }
        }
    }

    /// Day offset of the wall-clock moment `local` (in the source zone) once re-zoned.
    pub fn day_offset_at(&self, local: NaiveDateTime) -> i64 {
        self.reference(local).day_offset
    }

    pub(crate) fn reference(&self, local: NaiveDateTime) -> Reference {
        self.reference_at(localize(&self.source, local))
    }

    pub(crate) fn reference_at(&self, source: DateTime<Tz>) -> Reference {
        let target = source.with_timezone(&self.target);
        Reference {
            source,
            target,
            day_offset: day_offset(source.date_naive(), target.date_naive()),
        }
    }

    /// Re-zone a wall-clock moment of the source zone.
    pub(crate) fn to_target(&self, local: NaiveDateTime) -> DateTime<Tz> {
        localize(&self.source, local).with_timezone(&self.target)
    }

    /// Copy of `common` tagged with the target zone.
    pub(crate) fn retag(&self, common: &EventCommon) -> EventCommon {
        EventCommon {
            timezone: Some(self.target.name().to_string()),
            ..common.clone()
        }
    }
}
