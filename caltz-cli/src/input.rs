use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use caltz_core::CalendarEvent;
use serde_json::Value;
use tokio::io::AsyncReadExt;

/// Events read from the command line, remembering whether they came as an array.
pub enum EventBatch {
    One(CalendarEvent),
    Many(Vec<CalendarEvent>),
}

impl EventBatch {
    pub fn map(self, mut f: impl FnMut(&CalendarEvent) -> CalendarEvent) -> EventBatch {
        match self {
            EventBatch::One(event) => EventBatch::One(f(&event)),
            EventBatch::Many(events) => EventBatch::Many(events.iter().map(f).collect()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            EventBatch::One(event) => serde_json::to_string_pretty(event),
            EventBatch::Many(events) => serde_json::to_string_pretty(events),
        };
        json.context("Could not serialize events")
    }
}

/// Read the file, or stdin when no file (or `-`) is given.
pub async fn read_text(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Could not read stdin")?;
            Ok(text)
        }
    }
}

pub async fn read_events(file: Option<PathBuf>) -> Result<EventBatch> {
    let text = read_text(file.as_deref()).await?;
    parse_events(&text)
}

fn parse_events(text: &str) -> Result<EventBatch> {
    let value: Value = serde_json::from_str(text).context("Input is not valid JSON")?;

    match value {
        Value::Array(_) => {
            let events = serde_json::from_value(value).context("Invalid event in array")?;
            Ok(EventBatch::Many(events))
        }
        _ => {
            let event = serde_json::from_value(value).context("Invalid event")?;
            Ok(EventBatch::One(event))
        }
    }
}
