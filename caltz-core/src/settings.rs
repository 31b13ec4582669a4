//! Persisted caltz settings.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{CalTzError, CalTzResult};
use crate::monitor::{SettingsStore, SystemTimezone, TimezoneSettings};
use crate::zone;

fn default_source_timezone() -> String {
    zone::UTC.to_string()
}

fn is_default_source_timezone(zone: &String) -> bool {
    *zone == default_source_timezone()
}

/// Settings at ~/.config/caltz/config.toml
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CaltzConfig {
    /// Zone events are displayed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_timezone: Option<String>,

    /// Host timezone seen on the previous run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_system_timezone: Option<String>,

    /// Zone assumed for events that carry no `timezone`.
    #[serde(
        default = "default_source_timezone",
        skip_serializing_if = "is_default_source_timezone"
    )]
    pub default_source_timezone: String,
}

impl Default for CaltzConfig {
    fn default() -> Self {
        CaltzConfig {
            display_timezone: None,
            last_system_timezone: None,
            default_source_timezone: default_source_timezone(),
        }
    }
}

impl CaltzConfig {
    pub fn config_path() -> CalTzResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalTzError::Config("Could not determine config directory".into()))?
            .join("caltz");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config at the default location, creating a commented template on first run.
    pub async fn load() -> CalTzResult<Self> {
        let config_path = Self::config_path()?;

        if !tokio::fs::try_exists(&config_path).await? {
            Self::create_default_config(&config_path).await?;
        }

        Self::load_from(&config_path)
    }

    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> CalTzResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .build()
            .map_err(|e| CalTzError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalTzError::Config(e.to_string()))
    }

    pub async fn save_to(&self, path: &Path) -> CalTzResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CalTzError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CalTzError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        tokio::fs::write(path, content)
            .await
            .map_err(|e| CalTzError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub async fn create_default_config(path: &Path) -> CalTzResult<()> {
        let contents = format!(
            "\
# caltz configuration

# Zone events are displayed in (defaults to the system timezone):
# display_timezone = \"Europe/London\"

# Zone assumed for events without a timezone:
# default_source_timezone = \"{}\"
",
            zone::UTC
        );

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CalTzError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        tokio::fs::write(path, contents)
            .await
            .map_err(|e| CalTzError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn timezone_settings(&self) -> TimezoneSettings {
        TimezoneSettings {
            last_system_timezone: self.last_system_timezone.clone(),
            display_timezone: self.display_timezone.clone(),
        }
    }

    /// The zone to display events in: the setting, else the host zone, else UTC.
    pub fn display_zone(&self, host: &impl SystemTimezone) -> Tz {
        if let Some(name) = &self.display_timezone {
            match zone::resolve(name) {
                Ok(tz) => return tz,
                Err(e) => tracing::warn!(zone = %name, error = %e, "ignoring display timezone setting"),
            }
        }

        match host.current().and_then(|name| zone::resolve(&name)) {
            Ok(tz) => tz,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to UTC for display");
                Tz::UTC
            }
        }
    }
}

/// [`SettingsStore`] backed by a caltz config file.
///
/// Saving rewrites only the timezone keys; other settings in the file are kept.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSettingsStore { path: path.into() }
    }

    /// Store at ~/.config/caltz/config.toml
    pub fn default_location() -> CalTzResult<Self> {
        Ok(Self::new(CaltzConfig::config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> CalTzResult<TimezoneSettings> {
        Ok(CaltzConfig::load_from(&self.path)?.timezone_settings())
    }

    async fn save(&self, settings: &TimezoneSettings) -> CalTzResult<()> {
        let config = CaltzConfig {
            display_timezone: settings.display_timezone.clone(),
            last_system_timezone: settings.last_system_timezone.clone(),
            ..CaltzConfig::load_from(&self.path)?
        };
        config.save_to(&self.path).await
    }
}
