//! Typed events pushed by the backend over the event socket.
//!
//! Wire decoding and field validation live in
//! `infrastructure::dto::websocket`; by the time a [`ServerEvent`] exists its
//! required fields are present.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{ControlValue, DeviceStatus, Notification};

/// A validated inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Liveness probe; must be answered with a pong
    Ping,
    /// One control value changed
    SensorUpdate {
        device_id: String,
        control_id: String,
        value: f64,
        timestamp: Option<String>,
    },
    /// Device status changed
    StatusUpdate {
        device_id: String,
        status: DeviceStatus,
        timestamp: Option<String>,
    },
    /// Authoritative snapshot of a device's controls
    ControlStatusUpdate {
        device_id: String,
        controls: BTreeMap<String, ControlValue>,
        timestamp: Option<String>,
    },
    /// Alarm or plain notification
    Notification(Notification),
    /// `command_sent`, `command_executed`, `command_status` and `echo`
    Informational { kind: String, payload: Value },
    /// Any type this client does not understand
    Unrecognized { kind: String },
}

impl ServerEvent {
    /// The wire `type` this event was decoded from
    pub fn kind(&self) -> &str {
        match self {
            Self::Ping => "ping",
            Self::SensorUpdate { .. } => "sensor_update",
            Self::StatusUpdate { .. } => "status_update",
            Self::ControlStatusUpdate { .. } => "control_status_update",
            Self::Notification(_) => "notification",
            Self::Informational { kind, .. } | Self::Unrecognized { kind } => kind,
        }
    }
}
