//! Timezone names, resolution and DST-aware localisation.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;

use crate::error::{CalTzError, CalTzResult};

/// Canonical name used for UTC and for missing zones.
pub const UTC: &str = "utc";

/// Normalize a timezone identifier to an IANA name.
///
/// Missing, empty, `Z` and `utc` (any case) become `"utc"`. Valid IANA names are
/// returned untouched. Windows display names and IANA aliases are mapped with ICU4X.
/// Anything else is returned as-is so the caller can fall back.
pub fn normalize(zone: Option<&str>) -> String {
    let Some(zone) = zone.map(str::trim).filter(|z| !z.is_empty()) else {
        return UTC.to_string();
    };

    if zone.eq_ignore_ascii_case("z") || zone.eq_ignore_ascii_case(UTC) {
        return UTC.to_string();
    }

    if zone.parse::<Tz>().is_ok() {
        return zone.to_string();
    }

    canonical_iana(zone).unwrap_or_else(|| zone.to_string())
}

/// Canonical IANA name for a Windows zone name or an IANA alias.
fn canonical_iana(zone: &str) -> Option<String> {
    let iana_parser = IanaParserExtended::new();

    if let Some(tz) = WindowsParser::new().parse(zone, None) {
        if let Some(entry) = iana_parser.iter().find(|entry| entry.time_zone == tz) {
            return Some(entry.canonical.to_string());
        }
    }

    let parsed = iana_parser.parse(zone);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN && parsed.canonical.parse::<Tz>().is_ok() {
        return Some(parsed.canonical.to_string());
    }

    None
}

/// Normalize and load a timezone.
pub fn resolve(zone: &str) -> CalTzResult<Tz> {
    let normalized = normalize(Some(zone));

    if normalized == UTC {
        return Ok(Tz::UTC);
    }

    normalized
        .parse::<Tz>()
        .map_err(|_| CalTzError::UnknownTimezone(zone.to_string()))
}

/// Interpret a wall-clock datetime in `tz`.
///
/// A time that falls in a DST fold resolves to the earlier instant. A time inside a
/// DST gap does not exist on the wall clock and is moved forward by an hour.
pub fn localize(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            tracing::debug!(?local, zone = %tz.name(), "local time falls in a DST gap, moving forward");
            match tz.from_local_datetime(&(local + Duration::hours(1))) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
                LocalResult::None => tz.from_utc_datetime(&local),
            }
        }
    }
}

/// Signed number of calendar days between the source-zone and target-zone dates of one
/// instant, clamped to `-1..=1`.
pub fn day_offset(source_date: NaiveDate, target_date: NaiveDate) -> i64 {
    target_date
        .signed_duration_since(source_date)
        .num_days()
        .clamp(-1, 1)
}
