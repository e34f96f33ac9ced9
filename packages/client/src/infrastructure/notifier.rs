//! Terminal implementation of the desktop notification port.

use std::io::Write;

use crate::domain::{DesktopNotifier, NotificationPermission};

/// Rings the terminal bell and writes a one-line banner to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalNotifier {
    permission: NotificationPermission,
}

impl TerminalNotifier {
    pub fn new(permission: NotificationPermission) -> Self {
        Self { permission }
    }
}

impl DesktopNotifier for TerminalNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
    }

    fn show(&self, title: &str, body: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(e) = writeln!(stderr, "\x07[!] {}: {}", title, body) {
            tracing::debug!("Desktop notification failed: {}", e);
        }
    }
}
