//! Connection manager configuration.

use std::time::Duration;

use crate::domain::{
    ReconnectPolicy,
    notification::{DEFAULT_DUPLICATE_WINDOW, DEFAULT_NOTIFICATION_CAPACITY},
};

/// Default socket base URL; the user id is appended as the last path segment
pub const DEFAULT_WS_BASE_URL: &str = "ws://127.0.0.1:8080/ws";
/// Default REST backend base URL
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
/// Inbound frames longer than this many characters are dropped
pub const MAX_MESSAGE_CHARS: usize = 50_000;
/// Entries written to persistent storage
pub const PERSISTED_NOTIFICATION_CAPACITY: usize = 30;

/// Notification list settings
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// In-memory cap
    pub capacity: usize,
    /// Cap applied when writing to storage
    pub persisted_capacity: usize,
    /// Writes scheduled within this window are coalesced
    pub persist_throttle: Duration,
    /// Proximity window of the near-duplicate check
    pub duplicate_window: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_NOTIFICATION_CAPACITY,
            persisted_capacity: PERSISTED_NOTIFICATION_CAPACITY,
            persist_throttle: Duration::from_secs(1),
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
        }
    }
}

/// Settings of the [`ConnectionManager`](crate::connection::ConnectionManager)
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub ws_base_url: String,
    /// A socket that is not open within this duration is treated as dropped
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub max_message_chars: usize,
    pub notifications: NotificationConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            max_message_chars: MAX_MESSAGE_CHARS,
            notifications: NotificationConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            ..Self::default()
        }
    }
}
