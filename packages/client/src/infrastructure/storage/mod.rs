//! Notification persistence: store implementations, decoding and the
//! throttled writer.

mod file;
mod memory;
mod persister;

pub use file::FileNotificationStore;
pub use memory::InMemoryNotificationStore;
pub use persister::ThrottledPersister;

use serde_json::Value;

use crate::domain::{Notification, NotificationStore};

/// Decode a stored value.
///
/// Returns `None` when the value is not JSON or not an array. Array elements
/// that are not notification records are skipped.
pub fn decode_notifications(raw: &str) -> Option<Vec<Notification>> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<Notification>(item).ok())
                .collect(),
        ),
        _ => None,
    }
}

/// Load persisted notifications, newest first.
///
/// Never fails: a missing value yields an empty list, a corrupt value is
/// cleared from the store and also yields an empty list.
pub async fn load_notifications(store: &dyn NotificationStore) -> Vec<Notification> {
    let raw = match store.load().await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Failed to read stored notifications: {}", e);
            return Vec::new();
        }
    };

    match decode_notifications(&raw) {
        Some(notifications) => {
            tracing::debug!("Restored {} notifications from storage", notifications.len());
            notifications
        }
        None => {
            tracing::warn!("Stored notifications are corrupt, discarding them");
            if let Err(e) = store.clear().await {
                tracing::warn!("Failed to clear corrupt notifications: {}", e);
            }
            Vec::new()
        }
    }
}
