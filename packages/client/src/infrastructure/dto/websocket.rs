//! Socket frame DTOs.
//!
//! Inbound DTOs are deliberately lenient: every field is optional and ids may
//! arrive as strings or numbers. Required fields are enforced when converting
//! to [`ServerEvent`] (see `conversion`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::ServerEvent;

/// Why an inbound frame was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame of {length} characters exceeds the {limit} character limit")]
    TooLarge { length: usize, limit: usize },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("frame has no string 'type' field")]
    MissingType,

    #[error("'{kind}' frame is missing '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("'{kind}' frame is malformed: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Accept a string or a number; empty strings and anything else become `None`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `sensor_update`
#[derive(Debug, Deserialize)]
pub struct SensorUpdateDto {
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", alias = "control_id")]
    pub datastream_id: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

/// `status_update`
#[derive(Debug, Deserialize)]
pub struct StatusUpdateDto {
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

/// `control_status_update`
///
/// Each control is either a bare value or `{ "value": .., "timestamp": .. }`.
#[derive(Debug, Deserialize)]
pub struct ControlStatusUpdateDto {
    #[serde(default, deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub controls: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: Option<String>,
}

/// `alarm_notification` and `notification`
#[derive(Debug, Deserialize)]
pub struct NotificationMessageDto {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A notification record as served by the socket and the history endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default, alias = "deviceName")]
    pub device_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", alias = "alarmId")]
    pub alarm_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, alias = "triggeredAt")]
    pub triggered_at: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "isRead")]
    pub is_read: Option<bool>,
}

/// Frames sent by the client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Reply to a server `ping`
    Pong { timestamp: String },
    /// Change a device control
    DeviceCommand {
        device_id: String,
        control_id: String,
        command_type: String,
        value: f64,
        timestamp: String,
    },
    /// Diagnostic round trip
    Echo { message: String, timestamp: String },
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Frames that are too long, not JSON, untyped, or missing the fields their
/// type requires are rejected with a [`DecodeError`]. Unknown types decode
/// successfully as [`ServerEvent::Unrecognized`].
pub fn decode_server_event(raw: &str, max_chars: usize) -> Result<ServerEvent, DecodeError> {
    // byte length bounds the character count from above
    if raw.len() > max_chars {
        let length = raw.chars().count();
        if length > max_chars {
            return Err(DecodeError::TooLarge {
                length,
                limit: max_chars,
            });
        }
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    match kind.as_str() {
        "ping" => Ok(ServerEvent::Ping),
        "sensor_update" => from_value::<SensorUpdateDto>(&kind, value)?.try_into(),
        "status_update" => from_value::<StatusUpdateDto>(&kind, value)?.try_into(),
        "control_status_update" => {
            from_value::<ControlStatusUpdateDto>(&kind, value)?.try_into()
        }
        "alarm_notification" | "notification" => {
            from_value::<NotificationMessageDto>(&kind, value)?.try_into()
        }
        "command_sent" | "command_executed" | "command_status" | "echo" => {
            Ok(ServerEvent::Informational {
                kind,
                payload: value,
            })
        }
        _ => Ok(ServerEvent::Unrecognized { kind }),
    }
}

fn from_value<T: for<'de> Deserialize<'de>>(kind: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceStatus;

    const LIMIT: usize = 50_000;

    #[test]
    fn test_decode_ping() {
        // given (前提条件):
        let raw = r#"{"type":"ping","timestamp":"2024-05-01T10:00:00Z"}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert_eq!(result, Ok(ServerEvent::Ping));
    }

    #[test]
    fn test_decode_status_update_with_numeric_device_id() {
        // テスト項目: 数値の device_id も文字列として受け付ける
        // given (前提条件):
        let raw = r#"{"type":"status_update","device_id":7,"status":"online","timestamp":"T1"}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(ServerEvent::StatusUpdate {
                device_id: "7".to_string(),
                status: DeviceStatus::Online,
                timestamp: Some("T1".to_string()),
            })
        );
    }

    #[test]
    fn test_decode_rejects_oversized_frames() {
        // テスト項目: 50,000 文字を超えるフレームは破棄される
        // given (前提条件):
        let padding = "x".repeat(LIMIT);
        let raw = format!(r#"{{"type":"echo","message":"{padding}"}}"#);

        // when (操作):
        let result = decode_server_event(&raw, LIMIT);

        // then (期待する結果):
        assert!(matches!(result, Err(DecodeError::TooLarge { .. })));
    }

    #[test]
    fn test_decode_counts_characters_not_bytes() {
        // テスト項目: マルチバイト文字はバイト数ではなく文字数で判定される
        // given (前提条件):
        let message = "温".repeat(20);
        let raw = format!(r#"{{"type":"echo","message":"{message}"}}"#);
        let limit = raw.chars().count();
        assert!(raw.len() > limit);

        // when (操作):
        let result = decode_server_event(&raw, limit);

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        // given (前提条件):
        let raw = "{not json";

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert!(matches!(result, Err(DecodeError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_untyped_frames() {
        // given (前提条件):
        let raw = r#"{"device_id":"7"}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert_eq!(result, Err(DecodeError::MissingType));
    }

    #[test]
    fn test_decode_sensor_update_requires_value() {
        // テスト項目: value が null の sensor_update は破棄される
        // given (前提条件):
        let raw = r#"{"type":"sensor_update","device_id":"7","datastream_id":"v1","value":null}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DecodeError::MissingField {
                kind: "sensor_update".to_string(),
                field: "value",
            })
        );
    }

    #[test]
    fn test_decode_control_status_update_requires_object() {
        // given (前提条件):
        let raw = r#"{"type":"control_status_update","device_id":"7","controls":[1,2]}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_decode_notification_requires_data_id() {
        // given (前提条件):
        let raw = r#"{"type":"alarm_notification","data":{"title":"Smoke"}}"#;

        // when (操作):
        let result = decode_server_event(raw, LIMIT);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(DecodeError::MissingField {
                kind: "alarm_notification".to_string(),
                field: "data.id",
            })
        );
    }

    #[test]
    fn test_decode_informational_and_unknown_types() {
        // テスト項目: 情報系メッセージと未知のメッセージはエラーにならない
        // given (前提条件):
        let executed = r#"{"type":"command_executed","device_id":"7","success":true}"#;
        let unknown = r#"{"type":"firmware_progress","percent":40}"#;

        // when (操作):
        let executed = decode_server_event(executed, LIMIT).unwrap();
        let unknown = decode_server_event(unknown, LIMIT).unwrap();

        // then (期待する結果):
        assert_eq!(executed.kind(), "command_executed");
        assert_eq!(
            unknown,
            ServerEvent::Unrecognized {
                kind: "firmware_progress".to_string()
            }
        );
    }

    #[test]
    fn test_outbound_device_command_shape() {
        // テスト項目: device_command の JSON 形式が固定である
        // given (前提条件):
        let msg = OutboundMessage::DeviceCommand {
            device_id: "7".to_string(),
            control_id: "v1".to_string(),
            command_type: "set_value".to_string(),
            value: 1.0,
            timestamp: "2024-05-01T10:00:00.000Z".to_string(),
        };

        // when (操作):
        let json = serde_json::to_value(&msg).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({
                "type": "device_command",
                "device_id": "7",
                "control_id": "v1",
                "command_type": "set_value",
                "value": 1.0,
                "timestamp": "2024-05-01T10:00:00.000Z",
            })
        );
    }

    #[test]
    fn test_outbound_pong_shape() {
        // given (前提条件):
        let msg = OutboundMessage::Pong {
            timestamp: "T".to_string(),
        };

        // when (操作):
        let json = serde_json::to_string(&msg).unwrap();

        // then (期待する結果):
        assert_eq!(json, r#"{"type":"pong","timestamp":"T"}"#);
    }
}
