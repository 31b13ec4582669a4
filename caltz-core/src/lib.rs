//! Timezone conversion for calendar events.
//!
//! This crate provides the pieces a calendar front-end needs to show events in a
//! timezone other than the one they were written in:
//! - [`convert`] re-expresses single, weekly and RRULE events in another zone
//! - [`expansion`] corrects recurrence expansion per occurrence at render time
//! - [`monitor`] notices when the host timezone changed between runs
//! - [`zone`] normalizes Windows and shorthand zone names to IANA ones

pub mod byday;
pub mod convert;
pub mod error;
pub mod event;
pub mod expansion;
pub mod monitor;
pub mod settings;
pub mod time_of_day;
pub mod zone;

pub use convert::{ZoneShift, convert};
pub use error::{CalTzError, CalTzResult};
pub use event::*;
pub use expansion::patch_expansion;
pub use monitor::manage_timezone;
pub use settings::CaltzConfig;
pub use zone::normalize as normalize_timezone;
