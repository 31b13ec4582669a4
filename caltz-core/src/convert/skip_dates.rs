//! Exception dates of a recurring series, moved with the series' anchor time.

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

use crate::zone::localize;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Re-date every skip date: `date + anchor` in `source` is re-zoned to `target` and the
/// target calendar date is kept. Entries that are not valid dates are passed through,
/// so the list keeps its length and order.
pub fn translate(dates: &[String], anchor: NaiveTime, source: &Tz, target: &Tz) -> Vec<String> {
    dates
        .iter()
        .map(|text| match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
            Ok(date) => localize(source, date.and_time(anchor))
                .with_timezone(target)
                .date_naive()
                .format(DATE_FORMAT)
                .to_string(),
            Err(e) => {
                tracing::warn!(skip_date = %text, error = %e, "invalid skip date, leaving it unchanged");
                text.clone()
            }
        })
        .collect()
}
