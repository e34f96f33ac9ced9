//! Wire format of the development backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current value of one device control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub value: f64,
    pub timestamp: String,
}

/// Notification record as pushed and served from history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub triggered_at: String,
    pub created_at: String,
    #[serde(default)]
    pub is_read: bool,
}

/// Frames pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Ping {
        timestamp: String,
    },
    StatusUpdate {
        device_id: String,
        status: String,
        timestamp: String,
    },
    SensorUpdate {
        device_id: String,
        datastream_id: String,
        value: f64,
        timestamp: String,
    },
    ControlStatusUpdate {
        device_id: String,
        controls: BTreeMap<String, ControlState>,
        timestamp: String,
    },
    CommandSent {
        device_id: String,
        control_id: String,
        command_type: String,
        value: f64,
        timestamp: String,
    },
    CommandExecuted {
        device_id: String,
        control_id: String,
        value: f64,
        success: bool,
        timestamp: String,
    },
    AlarmNotification {
        data: NotificationRecord,
    },
    Echo {
        message: String,
        timestamp: String,
    },
}

/// Frames sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Pong {
        #[serde(default)]
        timestamp: Option<String>,
    },
    DeviceCommand {
        device_id: String,
        control_id: String,
        command_type: String,
        value: f64,
        #[serde(default)]
        timestamp: Option<String>,
    },
    Echo {
        message: String,
        #[serde(default)]
        timestamp: Option<String>,
    },
}

/// Query of `GET /api/notifications`
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: String,
}

/// Body of `POST /api/alarms`
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmRequest {
    pub user_id: String,
    /// Generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub alarm_id: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    /// Defaults to the time of the request
    #[serde(default)]
    pub triggered_at: Option<String>,
}

/// Body of `POST /api/devices/{device_id}/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub user_id: String,
    pub status: String,
}

/// Body of `POST /api/devices/{device_id}/sensors`
#[derive(Debug, Clone, Deserialize)]
pub struct SensorRequest {
    pub user_id: String,
    pub datastream_id: String,
    pub value: f64,
}

/// Response of the push endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Whether a socket was open for the user
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationRecord>,
}
