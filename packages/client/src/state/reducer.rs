//! Reducer from [`ServerEvent`]s to [`LiveState`] changes.
//!
//! The reducer is pure: anything that has to happen outside the state (a
//! reply on the socket, a desktop notification, a storage write) is returned
//! as an [`Effect`] for the connection manager to carry out.

use crate::domain::{DeviceControlRecord, DeviceStatusRecord, Notification, ServerEvent};

use super::LiveState;

/// Side effect requested by the reducer
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer a keepalive ping on the socket
    Pong { timestamp: String },
    /// Show a desktop notification if the user allowed it
    DesktopNotify { title: String, body: String },
    /// Schedule a write of the notification list
    PersistNotifications(Vec<Notification>),
}

/// Result of reducing one event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reduction {
    /// Whether subscribers must be notified
    pub changed: bool,
    pub effects: Vec<Effect>,
}

/// Apply one event to `state`.
///
/// `now` is the RFC 3339 timestamp used when the event carries none.
pub fn reduce(state: &mut LiveState, event: ServerEvent, now: &str) -> Reduction {
    match event {
        ServerEvent::Ping => Reduction {
            changed: false,
            effects: vec![Effect::Pong {
                timestamp: now.to_string(),
            }],
        },
        ServerEvent::SensorUpdate {
            device_id,
            control_id,
            value,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(|| now.to_string());
            state
                .device_controls
                .entry(device_id)
                .or_default()
                .merge_control(control_id, value, timestamp);
            changed()
        }
        ServerEvent::StatusUpdate {
            device_id,
            status,
            timestamp,
        } => {
            let record = DeviceStatusRecord {
                status,
                timestamp: timestamp.unwrap_or_else(|| now.to_string()),
            };
            let previous = state.device_status.insert(device_id, record.clone());
            Reduction {
                changed: previous.as_ref() != Some(&record),
                effects: Vec::new(),
            }
        }
        ServerEvent::ControlStatusUpdate {
            device_id,
            mut controls,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(|| now.to_string());
            for control in controls.values_mut() {
                if control.timestamp.is_empty() {
                    control.timestamp = timestamp.clone();
                }
            }
            state
                .device_controls
                .insert(device_id, DeviceControlRecord::replaced(controls, timestamp));
            changed()
        }
        ServerEvent::Notification(mut notification) => {
            // Stamp with the arrival time so history merges keep it newest.
            if notification.timestamp().is_none() {
                notification.created_at = Some(now.to_string());
            }
            let title = notification.title.clone();
            let body = notification.message.clone();
            let id = notification.id.clone();
            if !state.notifications.push_front(notification) {
                tracing::debug!("Ignoring duplicate notification '{}'", id);
                return Reduction::default();
            }
            Reduction {
                changed: true,
                effects: vec![
                    Effect::DesktopNotify { title, body },
                    Effect::PersistNotifications(state.notifications.as_slice().to_vec()),
                ],
            }
        }
        ServerEvent::Informational { kind, payload } => {
            tracing::debug!("Received '{}': {}", kind, payload);
            Reduction::default()
        }
        ServerEvent::Unrecognized { kind } => {
            tracing::trace!("Ignoring message of unknown type '{}'", kind);
            Reduction::default()
        }
    }
}

fn changed() -> Reduction {
    Reduction {
        changed: true,
        effects: Vec::new(),
    }
}
