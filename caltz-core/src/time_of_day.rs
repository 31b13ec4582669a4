//! Time-of-day strings as they appear on events (`"14:30"`, `"2:30 pm"`).

use std::fmt;

use chrono::{NaiveTime, Timelike};

const FORMAT_24H: &str = "%H:%M";
const FORMAT_12H: &str = "%I:%M %p";

/// An hour and minute on a wall clock. Seconds are not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        TimeOfDay {
            hour: time.hour(),
            minute: time.minute(),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse a time of day, trying 24-hour `HH:mm` first and then 12-hour `h:mm a`.
///
/// Returns `None` when neither format matches. Callers treat that as
/// "leave the event alone", never as a hard error.
pub fn parse(text: &str) -> Option<TimeOfDay> {
    let text = text.trim();

    NaiveTime::parse_from_str(text, FORMAT_24H)
        .or_else(|_| NaiveTime::parse_from_str(text, FORMAT_12H))
        .ok()
        .map(TimeOfDay::from)
}

/// Format a wall-clock time the way events store it (`HH:mm`).
pub fn format(time: NaiveTime) -> String {
    TimeOfDay::from(time).to_string()
}
