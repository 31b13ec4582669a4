use std::path::PathBuf;

use anyhow::{Context, Result};
use caltz_core::CalendarEvent;
use caltz_core::expansion::{FramingRange, RecurringSeries, RenderHost, patch_expansion};
use caltz_core::monitor::HostTimezone;
use caltz_core::settings::CaltzConfig;
use chrono::NaiveDate;
use chrono_tz::Tz;
use owo_colors::OwoColorize;

use crate::input;

pub async fn run(
    config: &CaltzConfig,
    start: NaiveDate,
    end: NaiveDate,
    display: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    if end <= start {
        anyhow::bail!("--end ({end}) must be after --start ({start})");
    }

    let display = match display {
        Some(zone) => zone,
        None => config.display_zone(&HostTimezone).name().to_string(),
    };

    let text = input::read_text(file.as_deref()).await?;
    let event: CalendarEvent = serde_json::from_str(&text).context("Invalid event")?;
    let series = RecurringSeries::from_event(&event, &config.default_source_timezone, start)?;

    let mut host = RenderHost::new(Tz::UTC);
    patch_expansion(&mut host, &display)?;
    let markers = host.expand(&series, &FramingRange::from_dates(start, end))?;

    if markers.is_empty() {
        eprintln!("{}", format!("No occurrences between {start} and {end}").dimmed());
        return Ok(());
    }

    for marker in markers {
        let day = marker.format("%Y-%m-%d %a").to_string();
        if series.all_day {
            println!("{}  {}", day, event.title());
        } else {
            let time = marker.format("%H:%M").to_string();
            println!("{} {}  {}", day, time.cyan(), event.title());
        }
    }

    Ok(())
}
