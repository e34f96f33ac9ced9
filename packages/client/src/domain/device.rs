//! Per-device status and control records.

use std::{collections::BTreeMap, fmt};

/// Reported connectivity of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Offline,
    /// Any other status string the backend reports
    Other(String),
}

impl DeviceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Other(status) => status,
        }
    }
}

impl From<&str> for DeviceStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest status of a device. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatusRecord {
    pub status: DeviceStatus,
    pub timestamp: String,
}

/// Latest value of a single control (datastream)
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValue {
    pub value: f64,
    pub timestamp: String,
}

/// All known control values of a device
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceControlRecord {
    pub controls: BTreeMap<String, ControlValue>,
    pub timestamp: String,
}

impl DeviceControlRecord {
    /// Build a record whose control map is exactly `controls`.
    pub fn replaced(controls: BTreeMap<String, ControlValue>, timestamp: String) -> Self {
        Self {
            controls,
            timestamp,
        }
    }

    /// Set one control, leaving every other control untouched.
    pub fn merge_control(&mut self, control_id: String, value: f64, timestamp: String) {
        self.controls.insert(
            control_id,
            ControlValue {
                value,
                timestamp: timestamp.clone(),
            },
        );
        self.timestamp = timestamp;
    }

    pub fn value(&self, control_id: &str) -> Option<f64> {
        self.controls.get(control_id).map(|control| control.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_parses_known_values_case_insensitively() {
        // given (前提条件):
        let values = ["online", "OFFLINE", "maintenance"];

        // when (操作):
        let statuses: Vec<DeviceStatus> = values.iter().map(|v| DeviceStatus::from(*v)).collect();

        // then (期待する結果):
        assert_eq!(statuses[0], DeviceStatus::Online);
        assert_eq!(statuses[1], DeviceStatus::Offline);
        assert_eq!(statuses[2], DeviceStatus::Other("maintenance".to_string()));
        assert_eq!(statuses[2].to_string(), "maintenance");
    }

    #[test]
    fn test_merge_control_keeps_other_controls() {
        // テスト項目: 1 つのコントロールを更新しても他のコントロールは保持される
        // given (前提条件):
        let mut record = DeviceControlRecord::default();
        record.merge_control("v1".to_string(), 1.0, "T1".to_string());

        // when (操作):
        record.merge_control("v2".to_string(), 20.5, "T2".to_string());

        // then (期待する結果):
        assert_eq!(record.value("v1"), Some(1.0));
        assert_eq!(record.value("v2"), Some(20.5));
        assert_eq!(record.timestamp, "T2");
    }

    #[test]
    fn test_replaced_drops_previous_controls() {
        // given (前提条件):
        let mut controls = BTreeMap::new();
        controls.insert(
            "v3".to_string(),
            ControlValue {
                value: 0.0,
                timestamp: "T3".to_string(),
            },
        );

        // when (操作):
        let record = DeviceControlRecord::replaced(controls, "T3".to_string());

        // then (期待する結果):
        assert_eq!(record.controls.len(), 1);
        assert_eq!(record.value("v1"), None);
    }
}
