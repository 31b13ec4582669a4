use std::path::PathBuf;

use anyhow::Result;
use caltz_core::monitor::HostTimezone;
use caltz_core::settings::CaltzConfig;
use caltz_core::{convert, zone};
use chrono::{Local, NaiveDate};

use crate::input;

pub async fn run(
    config: &CaltzConfig,
    from: Option<String>,
    to: Option<String>,
    today: Option<NaiveDate>,
    file: Option<PathBuf>,
) -> Result<()> {
    let target = match to {
        Some(zone) => zone,
        None => config.display_zone(&HostTimezone).name().to_string(),
    };
    zone::resolve(&target)?;
    if let Some(from) = &from {
        zone::resolve(from)?;
    }

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let events = input::read_events(file).await?;

    let converted = events.map(|event| {
        let source = from
            .as_deref()
            .or(event.timezone())
            .unwrap_or(&config.default_source_timezone);
        convert(event, source, &target, today)
    });

    println!("{}", converted.to_json()?);
    Ok(())
}
