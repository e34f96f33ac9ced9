//! Conversion of inbound DTOs into domain types.
//!
//! This is where the required fields of each frame type are enforced.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{ControlValue, DeviceStatus, Notification, ServerEvent};

use super::websocket::{
    ControlStatusUpdateDto, DecodeError, NotificationMessageDto, NotificationPayload,
    SensorUpdateDto, StatusUpdateDto,
};

/// Numeric reading of a control value: numbers, booleans and numeric strings.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn missing(kind: &str, field: &'static str) -> DecodeError {
    DecodeError::MissingField {
        kind: kind.to_string(),
        field,
    }
}

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<SensorUpdateDto> for ServerEvent {
    type Error = DecodeError;

    fn try_from(dto: SensorUpdateDto) -> Result<Self, Self::Error> {
        const KIND: &str = "sensor_update";
        let device_id = dto.device_id.ok_or_else(|| missing(KIND, "device_id"))?;
        let control_id = dto
            .datastream_id
            .ok_or_else(|| missing(KIND, "datastream_id"))?;
        let value = match dto.value {
            None | Some(Value::Null) => return Err(missing(KIND, "value")),
            Some(value) => numeric_value(&value).ok_or_else(|| DecodeError::Malformed {
                kind: KIND.to_string(),
                reason: format!("value {} is not numeric", value),
            })?,
        };

        Ok(ServerEvent::SensorUpdate {
            device_id,
            control_id,
            value,
            timestamp: dto.timestamp,
        })
    }
}

impl TryFrom<StatusUpdateDto> for ServerEvent {
    type Error = DecodeError;

    fn try_from(dto: StatusUpdateDto) -> Result<Self, Self::Error> {
        let device_id = dto
            .device_id
            .ok_or_else(|| missing("status_update", "device_id"))?;
        let status = dto
            .status
            .as_deref()
            .map(DeviceStatus::from)
            .unwrap_or_else(|| DeviceStatus::Other("unknown".to_string()));

        Ok(ServerEvent::StatusUpdate {
            device_id,
            status,
            timestamp: dto.timestamp,
        })
    }
}

impl TryFrom<ControlStatusUpdateDto> for ServerEvent {
    type Error = DecodeError;

    fn try_from(dto: ControlStatusUpdateDto) -> Result<Self, Self::Error> {
        const KIND: &str = "control_status_update";
        let device_id = dto.device_id.ok_or_else(|| missing(KIND, "device_id"))?;
        let raw_controls = dto.controls.ok_or_else(|| missing(KIND, "controls"))?;

        let mut controls = BTreeMap::new();
        for (control_id, raw) in raw_controls {
            let (value, timestamp) = match &raw {
                Value::Object(entry) => (
                    entry.get("value").and_then(numeric_value),
                    entry
                        .get("timestamp")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                ),
                other => (numeric_value(other), None),
            };
            match value {
                Some(value) => {
                    controls.insert(
                        control_id,
                        ControlValue {
                            value,
                            // filled in by the reducer when the frame has no timestamp either
                            timestamp: timestamp.or_else(|| dto.timestamp.clone()).unwrap_or_default(),
                        },
                    );
                }
                None => {
                    tracing::debug!(
                        "Skipping non-numeric control '{}' of device '{}'",
                        control_id,
                        device_id
                    );
                }
            }
        }

        Ok(ServerEvent::ControlStatusUpdate {
            device_id,
            controls,
            timestamp: dto.timestamp,
        })
    }
}

impl TryFrom<NotificationMessageDto> for ServerEvent {
    type Error = DecodeError;

    fn try_from(dto: NotificationMessageDto) -> Result<Self, Self::Error> {
        let data = match dto.data {
            Some(data @ Value::Object(_)) => data,
            _ => return Err(missing(&dto.kind, "data")),
        };
        let payload: NotificationPayload =
            serde_json::from_value(data).map_err(|e| DecodeError::Malformed {
                kind: dto.kind.clone(),
                reason: e.to_string(),
            })?;

        let default_kind = if dto.kind == "alarm_notification" {
            "alarm"
        } else {
            "notification"
        };
        let mut notification =
            Notification::try_from(payload).map_err(|_| missing(&dto.kind, "data.id"))?;
        notification
            .kind
            .get_or_insert_with(|| default_kind.to_string());

        Ok(ServerEvent::Notification(notification))
    }
}

/// The payload has no usable id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingNotificationId;

impl TryFrom<NotificationPayload> for Notification {
    type Error = MissingNotificationId;

    fn try_from(payload: NotificationPayload) -> Result<Self, Self::Error> {
        let id = payload.id.ok_or(MissingNotificationId)?;
        Ok(Self {
            id,
            title: payload.title.unwrap_or_else(|| "Notification".to_string()),
            message: payload.message.unwrap_or_default(),
            device_id: payload.device_id,
            device_name: payload.device_name,
            alarm_id: payload.alarm_id,
            kind: payload.kind,
            severity: payload.severity,
            triggered_at: payload.triggered_at,
            created_at: payload.created_at,
            is_read: payload.is_read.unwrap_or(false),
        })
    }
}
