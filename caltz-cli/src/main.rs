mod commands;
mod input;
mod notice;

use std::path::PathBuf;

use anyhow::Result;
use caltz_core::error::CalTzResult;
use caltz_core::monitor::{HostTimezone, manage_timezone};
use caltz_core::settings::{CaltzConfig, FileSettingsStore};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::notice::TerminalNotifier;

#[derive(Parser)]
#[command(name = "caltz")]
#[command(about = "Show calendar events in another timezone")]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert event JSON (one event or an array) to another timezone
    Convert {
        /// Zone the events are written in (default: each event's timezone)
        #[arg(long)]
        from: Option<String>,

        /// Zone to convert to (default: the display timezone)
        #[arg(long)]
        to: Option<String>,

        /// Reference date for weekly events without startRecur (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Event JSON file (default: stdin)
        file: Option<PathBuf>,
    },
    /// List the occurrences of a recurring event as seen in the display timezone
    Expand {
        /// First day to list (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Day after the last one to list (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Zone to display occurrences in (default: the display timezone)
        #[arg(long)]
        display: Option<String>,

        /// Event JSON file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Print the IANA name for a timezone identifier
    Normalize { zone: String },
    /// Show the system and display timezones
    Zone,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, config_path) = load_settings(FileSettingsStore::default_location()).await;

    match cli.command {
        Commands::Convert {
            from,
            to,
            today,
            file,
        } => commands::convert::run(&config, from, to, today, file).await,
        Commands::Expand {
            start,
            end,
            display,
            file,
        } => commands::expand::run(&config, start, end, display, file).await,
        Commands::Normalize { zone } => commands::normalize::run(&zone),
        Commands::Zone => commands::zone::run(&config, config_path.as_deref()),
    }
}

/// Run the timezone check and load the settings. Settings problems never stop a command:
/// they are logged and the defaults are used.
async fn load_settings(store: CalTzResult<FileSettingsStore>) -> (CaltzConfig, Option<PathBuf>) {
    let store = match store {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(error = %e, "no settings location, using defaults");
            return (CaltzConfig::default(), None);
        }
    };
    let path = store.path().to_path_buf();

    let ready = match tokio::fs::try_exists(&path).await {
        Ok(true) => Ok(()),
        Ok(false) => CaltzConfig::create_default_config(&path).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = ready {
        tracing::warn!(path = %path.display(), error = %e, "settings unavailable, using defaults");
        return (CaltzConfig::default(), Some(path));
    }

    let outcome = manage_timezone(&store, &TerminalNotifier, &HostTimezone).await;
    tracing::debug!(?outcome, "timezone check done");

    let config = CaltzConfig::load_from(&path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "cannot read settings, using defaults");
        CaltzConfig::default()
    });
    (config, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use caltz_core::error::CalTzError;

    #[tokio::test]
    async fn test_missing_settings_location_uses_defaults() {
        let store = Err(CalTzError::Config("Could not determine config directory".into()));
        let (config, path) = load_settings(store).await;
        assert_eq!(config, CaltzConfig::default());
        assert!(path.is_none());
    }

    #[tokio::test]
    async fn test_malformed_settings_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "display_timezone = [not toml").await.unwrap();

        let (config, loaded_from) = load_settings(Ok(FileSettingsStore::new(&path))).await;
        assert_eq!(config, CaltzConfig::default());
        assert_eq!(loaded_from, Some(path.clone()));

        // The file is left as the user wrote it.
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "display_timezone = [not toml");
    }

    #[tokio::test]
    async fn test_first_run_creates_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caltz").join("config.toml");

        let (_, loaded_from) = load_settings(Ok(FileSettingsStore::new(&path))).await;
        assert_eq!(loaded_from, Some(path.clone()));
        assert!(tokio::fs::try_exists(&path).await.unwrap());
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
