use std::io::Write;

use caltz_core::error::{CalTzError, CalTzResult};
use caltz_core::monitor::Notifier;
use owo_colors::OwoColorize;

/// Prints notices to stderr so they never mix with JSON on stdout.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) -> CalTzResult<()> {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{} {}", "notice:".yellow().bold(), message)
            .map_err(|e| CalTzError::Notice(e.to_string()))
    }
}
