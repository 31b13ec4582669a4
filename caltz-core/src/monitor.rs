//! Host timezone drift detection.
//!
//! On every start the host timezone is compared with the one recorded on the previous run.
//! The first run records it and adopts it as the display timezone. When it changes, the
//! display timezone is reset to the new host zone, the settings are saved and the user is
//! told. Nothing here fails: every error is logged and the check degrades to a no-op.

use std::future::Future;

use crate::error::{CalTzError, CalTzResult};

/// The persisted state the monitor reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimezoneSettings {
    pub last_system_timezone: Option<String>,
    pub display_timezone: Option<String>,
}

/// Source of the host's current IANA timezone.
pub trait SystemTimezone {
    fn current(&self) -> CalTzResult<String>;
}

/// The operating system's timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTimezone;

impl SystemTimezone for HostTimezone {
    fn current(&self) -> CalTzResult<String> {
        iana_time_zone::get_timezone().map_err(|e| CalTzError::TimezoneDetection(e.to_string()))
    }
}

pub trait SettingsStore {
    fn load(&self) -> impl Future<Output = CalTzResult<TimezoneSettings>> + Send;

    fn save(&self, settings: &TimezoneSettings) -> impl Future<Output = CalTzResult<()>> + Send;
}

/// User-facing notices. Failures are reported but never acted upon.
pub trait Notifier {
    fn notify(&self, message: &str) -> CalTzResult<()>;
}

/// What one run of [`manage_timezone`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// First run: the host zone was recorded and adopted for display.
    Initialized { current: String },
    Unchanged,
    /// The host zone moved; the display zone was reset to it.
    Changed { previous: String, current: String },
    /// Detection or loading failed; nothing was touched.
    Skipped,
}

pub async fn manage_timezone<S, N, H>(store: &S, notifier: &N, host: &H) -> MonitorOutcome
where
    S: SettingsStore,
    N: Notifier,
    H: SystemTimezone,
{
    let current = match host.current() {
        Ok(current) => current,
        Err(e) => {
            tracing::debug!(error = %e, "skipping timezone check");
            return MonitorOutcome::Skipped;
        }
    };

    let settings = match store.load().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "cannot load settings, skipping timezone check");
            return MonitorOutcome::Skipped;
        }
    };

    let previous = match settings {
        TimezoneSettings {
            last_system_timezone: Some(previous),
            display_timezone: Some(_),
        } => previous,
        _ => {
            let initialized = TimezoneSettings {
                last_system_timezone: Some(current.clone()),
                display_timezone: Some(current.clone()),
            };
            save(store, &initialized).await;
            tracing::debug!(zone = %current, "recorded system timezone");
            return MonitorOutcome::Initialized { current };
        }
    };

    if previous == current {
        return MonitorOutcome::Unchanged;
    }

    let updated = TimezoneSettings {
        last_system_timezone: Some(current.clone()),
        display_timezone: Some(current.clone()),
    };
    save(store, &updated).await;

    let message = format!("System timezone changed. Display timezone set to {current}.");
    if let Err(e) = notifier.notify(&message) {
        tracing::warn!(error = %e, "failed to show timezone notice");
    }

    tracing::info!(%previous, %current, "system timezone changed");
    MonitorOutcome::Changed { previous, current }
}

async fn save<S: SettingsStore>(store: &S, settings: &TimezoneSettings) {
    if let Err(e) = store.save(settings).await {
        tracing::warn!(error = %e, "failed to save timezone settings");
    }
}
