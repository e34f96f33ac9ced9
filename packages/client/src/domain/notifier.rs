//! Desktop notification port.

/// Whether the user allowed desktop notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// The user has not been asked yet
    #[default]
    Default,
}

/// Best-effort desktop notification sink.
///
/// Implementations must not block and must swallow their own failures.
#[cfg_attr(test, mockall::automock)]
pub trait DesktopNotifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    fn show(&self, title: &str, body: &str);
}
