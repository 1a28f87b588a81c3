// src/tasks/job/terminal.rs

//! Raw terminal mode for interactive jobs.

use std::io::IsTerminal;

use crossterm::terminal;
use tracing::{debug, warn};

/// Puts the terminal into raw mode and restores it when dropped, so the
/// terminal is restored on every exit path including unwinding.
#[derive(Debug)]
pub(super) struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    /// Enable raw mode when stdin is a terminal; otherwise a no-op guard.
    pub(super) fn enable() -> Self {
        if !std::io::stdin().is_terminal() {
            debug!("stdin is not a terminal, leaving terminal mode alone");
            return Self { enabled: false };
        }
        match terminal::enable_raw_mode() {
            Ok(()) => Self { enabled: true },
            Err(err) => {
                warn!(error = %err, "failed to put terminal into raw mode");
                Self { enabled: false }
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(err) = terminal::disable_raw_mode() {
                warn!(error = %err, "failed to restore terminal");
            }
        }
    }
}
