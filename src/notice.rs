//! Operator-facing notices.
//!
//! Progress lines and per-document failures are routed through a
//! [`Notifier`] handed to each component when it is built, instead of a
//! process-wide "silent" switch.

use std::fmt::Display;

use tracing::{info, warn};

/// Emits one-line operator notices unless silenced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notifier {
    silent: bool,
}

impl Notifier {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    /// A notifier that drops every notice.
    pub fn silent() -> Self {
        Self::new(true)
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Progress information, e.g. a newly discovered document.
    pub fn progress(&self, message: impl Display) {
        if !self.silent {
            info!(target: "notice", "[i] {message}");
        }
    }

    /// A recoverable failure: the affected unit is skipped.
    pub fn failure(&self, message: impl Display) {
        if !self.silent {
            warn!(target: "notice", "[!] {message}");
        }
    }
}
