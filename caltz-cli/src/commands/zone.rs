use std::path::Path;

use anyhow::Result;
use caltz_core::monitor::{HostTimezone, SystemTimezone};
use caltz_core::settings::CaltzConfig;
use owo_colors::OwoColorize;

pub fn run(config: &CaltzConfig, config_path: Option<&Path>) -> Result<()> {
    println!("{}", "Timezones".bold());
    match HostTimezone.current() {
        Ok(zone) => println!("  System:   {zone}"),
        Err(e) => println!("  System:   {}", format!("unknown ({e})").dimmed()),
    }
    println!("  Display:  {}", config.display_zone(&HostTimezone).name());
    println!("  Default:  {}", config.default_source_timezone);

    println!();
    println!("{}", "Paths".bold());
    match config_path {
        Some(path) => println!("  Config:   {}", path.display()),
        None => println!("  Config:   {}", "unavailable".dimmed()),
    }

    Ok(())
}
