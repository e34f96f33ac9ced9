//! Notification records and the capped, de-duplicated notification list.
//!
//! The list is kept newest-first. Two predicates decide whether an incoming
//! record is already present:
//!
//! 1. [`same_id`]: exact identifier match.
//! 2. [`near_duplicate`]: same device and type with timestamps inside a
//!    proximity window. Only applies when both records carry all three.
//!
//! [`is_duplicate`] composes them in that order.

use std::time::Duration;

use devicehub_shared::time::parse_rfc3339_millis;
use serde::{Deserialize, Serialize};

/// Default in-memory capacity of the notification list
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 50;

/// Default proximity window of [`near_duplicate`]
pub const DEFAULT_DUPLICATE_WINDOW: Duration = Duration::from_secs(5);

/// A notification as shown to the user and persisted across restarts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_id: Option<String>,
    /// Notification type, e.g. `alarm` or `info`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

impl Notification {
    /// Create an unread notification with only the mandatory fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: message.into(),
            device_id: None,
            device_name: None,
            alarm_id: None,
            kind: None,
            severity: None,
            triggered_at: None,
            created_at: None,
            is_read: false,
        }
    }

    /// When the notification happened: `triggered_at`, falling back to `created_at`
    pub fn timestamp(&self) -> Option<&str> {
        self.triggered_at.as_deref().or(self.created_at.as_deref())
    }

    fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp().and_then(parse_rfc3339_millis)
    }
}

/// Exact identifier match
pub fn same_id(existing: &Notification, incoming: &Notification) -> bool {
    existing.id == incoming.id
}

/// Same device and type, triggered within `window` of each other.
///
/// Returns `false` whenever either record lacks a device id, a type or a
/// parseable timestamp.
pub fn near_duplicate(existing: &Notification, incoming: &Notification, window: Duration) -> bool {
    let (Some(device_a), Some(device_b)) = (&existing.device_id, &incoming.device_id) else {
        return false;
    };
    let (Some(kind_a), Some(kind_b)) = (&existing.kind, &incoming.kind) else {
        return false;
    };
    let (Some(at_a), Some(at_b)) = (existing.timestamp_millis(), incoming.timestamp_millis())
    else {
        return false;
    };

    let window_millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    device_a == device_b && kind_a == kind_b && (at_a - at_b).abs() <= window_millis
}

/// Composition of [`same_id`] and [`near_duplicate`], in that order
pub fn is_duplicate(existing: &Notification, incoming: &Notification, window: Duration) -> bool {
    same_id(existing, incoming) || near_duplicate(existing, incoming, window)
}

/// Newest-first list bounded to `capacity` entries with unique identifiers
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationList {
    items: Vec<Notification>,
    capacity: usize,
    duplicate_window: Duration,
}

impl Default for NotificationList {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_DUPLICATE_WINDOW)
    }
}

impl NotificationList {
    pub fn new(capacity: usize, duplicate_window: Duration) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            duplicate_window,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Notification] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    fn contains_duplicate_of(&self, incoming: &Notification) -> bool {
        self.items
            .iter()
            .any(|existing| is_duplicate(existing, incoming, self.duplicate_window))
    }

    fn truncate(&mut self) {
        if self.items.len() > self.capacity {
            self.items.truncate(self.capacity);
        }
    }

    /// Prepend a freshly pushed notification.
    ///
    /// Returns `false` and leaves the list unchanged when it is a duplicate.
    pub fn push_front(&mut self, notification: Notification) -> bool {
        if self.contains_duplicate_of(&notification) {
            return false;
        }
        self.items.insert(0, notification);
        self.truncate();
        true
    }

    /// Merge a bulk-fetched history into the list.
    ///
    /// Unknown records are added, then the list is re-ordered newest-first by
    /// timestamp (records without one sort last, keeping their relative order)
    /// and capped. Returns the number of records added.
    pub fn merge_history(&mut self, history: Vec<Notification>) -> usize {
        let mut added = 0;
        for item in history {
            if !self.contains_duplicate_of(&item) {
                self.items.push(item);
                added += 1;
            }
        }
        self.items
            .sort_by_key(|n| std::cmp::Reverse(n.timestamp_millis()));
        self.truncate();
        added
    }

    /// Remove a notification by id. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Mark one notification read. Returns `false` if it was unknown or already read.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) if !n.is_read => {
                n.is_read = true;
                true
            }
            _ => false,
        }
    }

    /// Mark every notification read. Returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut().filter(|n| !n.is_read) {
            n.is_read = true;
            changed += 1;
        }
        changed
    }
}
