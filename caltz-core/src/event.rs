//! Calendar events as handed to the converter by providers.
//!
//! Providers (local notes, ICS feeds, CalDAV, Google) parse their own formats and
//! produce a [`CalendarEvent`]. The time-like fields are wall-clock values expressed
//! in the event's `timezone`; converting an event re-expresses them in another zone.
//!
//! On the wire an event is a flat camelCase JSON object with a `type` discriminant
//! (`single`, `recurring` or `rrule`) and an `allDay` flag. Internally the variant and
//! the all-day flag are part of the type, so every `{variant} x {all-day, timed}`
//! combination is matched exhaustively.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::CalTzError;
use crate::time_of_day;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A calendar event in one of the three shapes providers produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEvent", into = "RawEvent")]
pub enum CalendarEvent {
    Single(SingleEvent),
    Recurring(RecurringEvent),
    RRule(RRuleEvent),
}

/// Fields shared by every event variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventCommon {
    pub title: String,
    /// Zone the time-like fields are expressed in. Absent for all-day events.
    pub timezone: Option<String>,
    /// Provider fields the converter does not interpret (ids, categories, ...).
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Whether an event occupies whole days or a time range.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTiming {
    AllDay,
    Timed(TimeRange),
}

/// Start and end times as stored on the event. They are kept as text and only
/// parsed during conversion, so unparseable values survive untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRange {
    pub start_time: String,
    pub end_time: Option<String>,
}

/// A one-off event.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleEvent {
    pub common: EventCommon,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub timing: EventTiming,
}

/// A weekly event that recurs on a set of weekdays.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringEvent {
    pub common: EventCommon,
    pub days_of_week: Vec<DayCode>,
    pub start_recur: Option<NaiveDate>,
    pub end_recur: Option<NaiveDate>,
    /// Dates (`YYYY-MM-DD`) on which the series is skipped.
    pub skip_dates: Vec<String>,
    pub timing: EventTiming,
}

/// An event recurring according to an RFC 5545 RRULE.
#[derive(Debug, Clone, PartialEq)]
pub struct RRuleEvent {
    pub common: EventCommon,
    pub start_date: RRuleStart,
    pub rrule: String,
    pub skip_dates: Vec<String>,
    pub timing: EventTiming,
    /// `startTime` was present on the wire. When false the time of day lives only in
    /// `startDate` and is not written back out.
    pub explicit_start_time: bool,
}

/// The two encodings of an RRULE series start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RRuleStart {
    /// Bare date; the time of day lives in `startTime`.
    Date(NaiveDate),
    /// ISO datetime with the wall-clock time embedded.
    DateTime(NaiveDateTime),
    /// ISO datetime carrying an explicit UTC offset.
    Instant(DateTime<FixedOffset>),
}

impl RRuleStart {
    pub fn parse(text: &str) -> Result<Self, CalTzError> {
        let text = text.trim();

        if !text.contains('T') {
            return NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(RRuleStart::Date)
                .map_err(|e| CalTzError::InvalidDate(format!("{text}: {e}")));
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
            return Ok(RRuleStart::Instant(instant));
        }

        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
            .map(RRuleStart::DateTime)
            .map_err(|e| CalTzError::InvalidDate(format!("{text}: {e}")))
    }

    pub fn has_time(&self) -> bool {
        !matches!(self, RRuleStart::Date(_))
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            RRuleStart::Date(date) => *date,
            RRuleStart::DateTime(datetime) => datetime.date(),
            RRuleStart::Instant(instant) => instant.date_naive(),
        }
    }
}

impl std::fmt::Display for RRuleStart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RRuleStart::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            RRuleStart::DateTime(datetime) => write!(f, "{}", datetime.format(DATETIME_FORMAT)),
            RRuleStart::Instant(instant) => write!(f, "{}", instant.to_rfc3339()),
        }
    }
}

/// One-letter weekday codes used by `daysOfWeek`, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayCode {
    U,
    M,
    T,
    W,
    R,
    F,
    S,
}

impl DayCode {
    pub const ALL: [DayCode; 7] = [
        DayCode::U,
        DayCode::M,
        DayCode::T,
        DayCode::W,
        DayCode::R,
        DayCode::F,
        DayCode::S,
    ];

    /// Position in the Sunday-first week.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Move by `days`, wrapping around the week in both directions.
    pub fn shift(self, days: i64) -> DayCode {
        let index = (self.index() as i64 + days).rem_euclid(7);
        DayCode::ALL[index as usize]
    }

    /// The RFC 5545 two-letter token for this weekday.
    pub fn rrule_token(self) -> &'static str {
        match self {
            DayCode::U => "SU",
            DayCode::M => "MO",
            DayCode::T => "TU",
            DayCode::W => "WE",
            DayCode::R => "TH",
            DayCode::F => "FR",
            DayCode::S => "SA",
        }
    }

    pub fn from_rrule_token(token: &str) -> Option<DayCode> {
        DayCode::ALL
            .into_iter()
            .find(|day| day.rrule_token().eq_ignore_ascii_case(token))
    }
}

impl From<Weekday> for DayCode {
    fn from(weekday: Weekday) -> Self {
        DayCode::ALL[weekday.num_days_from_sunday() as usize]
    }
}

impl CalendarEvent {
    pub fn common(&self) -> &EventCommon {
        match self {
            CalendarEvent::Single(e) => &e.common,
            CalendarEvent::Recurring(e) => &e.common,
            CalendarEvent::RRule(e) => &e.common,
        }
    }

    pub fn timing(&self) -> &EventTiming {
        match self {
            CalendarEvent::Single(e) => &e.timing,
            CalendarEvent::Recurring(e) => &e.timing,
            CalendarEvent::RRule(e) => &e.timing,
        }
    }

    pub fn title(&self) -> &str {
        &self.common().title
    }

    pub fn timezone(&self) -> Option<&str> {
        self.common().timezone.as_deref()
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self.timing(), EventTiming::AllDay)
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, CalendarEvent::Single(_))
    }
}

// Wire representation

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawKind {
    Single,
    Recurring,
    Rrule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    kind: RawKind,
    title: String,
    #[serde(default)]
    all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    /// Outer `None` omits the key; single events always write it, as `null` when open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    days_of_week: Option<Vec<DayCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_recur: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_recur: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rrule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip_dates: Option<Vec<String>>,

    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl RawEvent {
    fn timing(&self, embedded_start: Option<&RRuleStart>) -> Result<EventTiming, CalTzError> {
        if self.all_day {
            if self.start_time.is_some() || self.end_time.is_some() {
                tracing::debug!(title = %self.title, "dropping time fields from all-day event");
            }
            return Ok(EventTiming::AllDay);
        }

        let start_time = match (&self.start_time, embedded_start) {
            (Some(start_time), _) => start_time.clone(),
            (None, Some(RRuleStart::DateTime(datetime))) => time_of_day::format(datetime.time()),
            (None, Some(RRuleStart::Instant(instant))) => time_of_day::format(instant.time()),
            _ => {
                return Err(CalTzError::InvalidEvent(format!(
                    "timed event '{}' has no startTime",
                    self.title
                )));
            }
        };

        Ok(EventTiming::Timed(TimeRange {
            start_time,
            end_time: self.end_time.clone(),
        }))
    }
}

fn split_timing(timing: EventTiming) -> (bool, Option<String>, Option<String>) {
    match timing {
        EventTiming::AllDay => (true, None, None),
        EventTiming::Timed(range) => (false, Some(range.start_time), range.end_time),
    }
}

impl TryFrom<RawEvent> for CalendarEvent {
    type Error = CalTzError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let missing =
            |field: &str| CalTzError::InvalidEvent(format!("'{}' is missing {field}", raw.title));

        let event = match raw.kind {
            RawKind::Single => CalendarEvent::Single(SingleEvent {
                date: raw.date.ok_or_else(|| missing("date"))?,
                end_date: raw.end_date.flatten(),
                timing: raw.timing(None)?,
                common: common_of(&raw),
            }),
            RawKind::Recurring => CalendarEvent::Recurring(RecurringEvent {
                days_of_week: raw.days_of_week.clone().ok_or_else(|| missing("daysOfWeek"))?,
                start_recur: raw.start_recur,
                end_recur: raw.end_recur,
                skip_dates: raw.skip_dates.clone().unwrap_or_default(),
                timing: raw.timing(None)?,
                common: common_of(&raw),
            }),
            RawKind::Rrule => {
                let start_date =
                    RRuleStart::parse(raw.start_date.as_deref().ok_or_else(|| missing("startDate"))?)?;
                CalendarEvent::RRule(RRuleEvent {
                    rrule: raw.rrule.clone().ok_or_else(|| missing("rrule"))?,
                    skip_dates: raw.skip_dates.clone().unwrap_or_default(),
                    timing: raw.timing(Some(&start_date))?,
                    explicit_start_time: raw.start_time.is_some(),
                    start_date,
                    common: common_of(&raw),
                })
            }
        };

        Ok(event)
    }
}

fn common_of(raw: &RawEvent) -> EventCommon {
    EventCommon {
        title: raw.title.clone(),
        timezone: raw.timezone.clone(),
        extra: raw.extra.clone(),
    }
}

impl From<CalendarEvent> for RawEvent {
    fn from(event: CalendarEvent) -> Self {
        let blank = |kind: RawKind, common: EventCommon, timing: EventTiming| {
            let (all_day, start_time, end_time) = split_timing(timing);
            RawEvent {
                kind,
                title: common.title,
                all_day,
                timezone: common.timezone,
                date: None,
                end_date: None,
                start_time,
                end_time,
                days_of_week: None,
                start_recur: None,
                end_recur: None,
                start_date: None,
                rrule: None,
                skip_dates: None,
                extra: common.extra,
            }
        };

        match event {
            CalendarEvent::Single(e) => RawEvent {
                date: Some(e.date),
                end_date: Some(e.end_date),
                ..blank(RawKind::Single, e.common, e.timing)
            },
            CalendarEvent::Recurring(e) => RawEvent {
                days_of_week: Some(e.days_of_week),
                start_recur: e.start_recur,
                end_recur: e.end_recur,
                skip_dates: Some(e.skip_dates),
                ..blank(RawKind::Recurring, e.common, e.timing)
            },
            CalendarEvent::RRule(e) => {
                let embedded_only = !e.explicit_start_time && e.start_date.has_time();
                let raw = RawEvent {
                    start_date: Some(e.start_date.to_string()),
                    rrule: Some(e.rrule),
                    skip_dates: Some(e.skip_dates),
                    ..blank(RawKind::Rrule, e.common, e.timing)
                };
                if embedded_only {
                    RawEvent {
                        start_time: None,
                        ..raw
                    }
                } else {
                    raw
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_day_code_shift_wraps() {
        assert_eq!(DayCode::S.shift(1), DayCode::U);
        assert_eq!(DayCode::U.shift(-1), DayCode::S);
        assert_eq!(DayCode::W.shift(0), DayCode::W);
        assert_eq!(DayCode::R.shift(8), DayCode::F);
    }

    #[test]
    fn test_day_code_tokens() {
        assert_eq!(DayCode::R.rrule_token(), "TH");
        assert_eq!(DayCode::from_rrule_token("su"), Some(DayCode::U));
        assert_eq!(DayCode::from_rrule_token("XX"), None);
        assert_eq!(DayCode::from(Weekday::Sat), DayCode::S);
    }

    #[test]
    fn test_deserialize_single_timed() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "type": "single",
            "title": "Standup",
            "allDay": false,
            "timezone": "America/New_York",
            "date": "2024-01-15",
            "endDate": null,
            "startTime": "14:30",
            "endTime": "15:30",
            "id": "abc-123"
        }))
        .unwrap();

        let CalendarEvent::Single(single) = &event else {
            panic!("expected a single event");
        };
        assert_eq!(single.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(
            single.timing,
            EventTiming::Timed(TimeRange {
                start_time: "14:30".into(),
                end_time: Some("15:30".into()),
            })
        );
        assert_eq!(single.common.extra.get("id"), Some(&json!("abc-123")));
    }

    #[test]
    fn test_deserialize_recurring_all_day() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "type": "recurring",
            "title": "Bins",
            "allDay": true,
            "daysOfWeek": ["M", "R"],
            "startRecur": "2024-01-01",
            "skipDates": ["2024-01-04"]
        }))
        .unwrap();

        let CalendarEvent::Recurring(recurring) = &event else {
            panic!("expected a recurring event");
        };
        assert_eq!(recurring.days_of_week, vec![DayCode::M, DayCode::R]);
        assert_eq!(recurring.timing, EventTiming::AllDay);
        assert_eq!(recurring.skip_dates, vec!["2024-01-04".to_string()]);
    }

    #[test]
    fn test_deserialize_rrule_embedded_start_fills_start_time() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "type": "rrule",
            "title": "Gym",
            "startDate": "2025-06-02T01:00:00",
            "rrule": "FREQ=WEEKLY;BYDAY=MO,WE"
        }))
        .unwrap();

        let CalendarEvent::RRule(rrule) = &event else {
            panic!("expected an rrule event");
        };
        assert!(rrule.start_date.has_time());
        assert_eq!(
            rrule.timing,
            EventTiming::Timed(TimeRange {
                start_time: "01:00".into(),
                end_time: None,
            })
        );
    }

    #[test]
    fn test_deserialize_rejects_missing_fields() {
        let missing_date = serde_json::from_value::<CalendarEvent>(json!({
            "type": "single",
            "title": "No date",
            "startTime": "10:00"
        }));
        assert!(missing_date.is_err());

        let missing_start = serde_json::from_value::<CalendarEvent>(json!({
            "type": "single",
            "title": "No start",
            "date": "2024-01-15"
        }));
        assert!(missing_start.is_err());
    }

    #[test]
    fn test_serialize_keeps_wire_shape() {
        let event = CalendarEvent::RRule(RRuleEvent {
            common: EventCommon {
                title: "Gym".into(),
                timezone: Some("UTC".into()),
                extra: BTreeMap::new(),
            },
            start_date: RRuleStart::Date(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
            rrule: "FREQ=WEEKLY;BYDAY=MO".into(),
            skip_dates: vec![],
            timing: EventTiming::Timed(TimeRange {
                start_time: "07:00".into(),
                end_time: Some("08:00".into()),
            }),
            explicit_start_time: true,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "rrule");
        assert_eq!(value["allDay"], false);
        assert_eq!(value["startDate"], "2025-06-02");
        assert_eq!(value["startTime"], "07:00");
        assert_eq!(value["skipDates"], json!([]));
        assert!(value.get("date").is_none());
    }

    #[test]
    fn test_single_event_writes_null_end_date() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "type": "single",
            "title": "Dentist",
            "date": "2024-01-15",
            "startTime": "09:00"
        }))
        .unwrap();

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value.get("endDate"), Some(&serde_json::Value::Null));

        let event: CalendarEvent = serde_json::from_value(json!({
            "type": "single",
            "title": "Trip",
            "date": "2024-01-15",
            "endDate": "2024-01-17",
            "allDay": true
        }))
        .unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["endDate"], "2024-01-17");
    }

    #[test]
    fn test_embedded_start_time_is_not_written_back() {
        let input = json!({
            "type": "rrule",
            "title": "Gym",
            "startDate": "2025-06-02T01:00:00",
            "rrule": "FREQ=WEEKLY;BYDAY=MO,WE",
            "endTime": "02:00"
        });
        let event: CalendarEvent = serde_json::from_value(input).unwrap();

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("startTime").is_none());
        assert_eq!(value["startDate"], "2025-06-02T01:00:00");
        assert_eq!(value["endTime"], "02:00");

        let explicit: CalendarEvent = serde_json::from_value(json!({
            "type": "rrule",
            "title": "Gym",
            "startDate": "2025-06-02T01:00:00",
            "startTime": "01:00",
            "rrule": "FREQ=WEEKLY;BYDAY=MO,WE"
        }))
        .unwrap();
        let value = serde_json::to_value(&explicit).unwrap();
        assert_eq!(value["startTime"], "01:00");
    }

    #[test]
    fn test_rrule_start_parse_encodings() {
        assert!(matches!(RRuleStart::parse("2025-06-02"), Ok(RRuleStart::Date(_))));
        assert!(matches!(
            RRuleStart::parse("2025-06-02T01:00:00"),
            Ok(RRuleStart::DateTime(_))
        ));
        assert!(matches!(
            RRuleStart::parse("2025-06-02T01:00"),
            Ok(RRuleStart::DateTime(_))
        ));
        assert!(matches!(
            RRuleStart::parse("2025-06-02T01:00:00Z"),
            Ok(RRuleStart::Instant(_))
        ));
        assert!(RRuleStart::parse("June 2nd").is_err());
    }
}
