//! Shared state of the development backend.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::protocol::{ControlState, NotificationRecord, ServerMessage};

/// User ids with this prefix are rejected as "not online"
pub const OFFLINE_USER_PREFIX: &str = "offline-";

/// History entries kept per user
const HISTORY_CAPACITY: usize = 100;

/// Behaviour knobs of the development backend
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interval of the JSON `ping` frames
    pub ping_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Channel of one open socket
struct SessionEntry {
    session_id: Uuid,
    sender: mpsc::UnboundedSender<String>,
}

/// Shared application state
#[derive(Default)]
pub struct AppState {
    pub config: ServerConfig,
    /// One socket per user; a newer connection replaces the older one
    sessions: Mutex<HashMap<String, SessionEntry>>,
    /// Notification history per user, newest first
    history: Mutex<HashMap<String, Vec<NotificationRecord>>>,
    /// Last known controls per device
    controls: Mutex<HashMap<String, BTreeMap<String, ControlState>>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register the socket of `user_id`, replacing any previous one.
    pub async fn register(&self, user_id: &str, sender: mpsc::UnboundedSender<String>) -> Uuid {
        let session_id = Uuid::new_v4();
        let previous = self.sessions.lock().await.insert(
            user_id.to_string(),
            SessionEntry { session_id, sender },
        );
        if previous.is_some() {
            tracing::info!("User '{}' reconnected; previous session replaced", user_id);
        }
        session_id
    }

    /// Remove the socket of `user_id` if it is still `session_id`.
    pub async fn unregister(&self, user_id: &str, session_id: Uuid) {
        let mut sessions = self.sessions.lock().await;
        if sessions
            .get(user_id)
            .is_some_and(|entry| entry.session_id == session_id)
        {
            sessions.remove(user_id);
            tracing::info!("User '{}' disconnected", user_id);
        }
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.sessions.lock().await.contains_key(user_id)
    }

    /// Push `message` to the socket of `user_id`; false when none is open.
    pub async fn push_to(&self, user_id: &str, message: &ServerMessage) -> bool {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return false;
            }
        };

        let sessions = self.sessions.lock().await;
        match sessions.get(user_id) {
            Some(entry) => entry.sender.send(json).is_ok(),
            None => {
                tracing::debug!("User '{}' has no open socket", user_id);
                false
            }
        }
    }

    /// Prepend `record` to the history of `user_id`, replacing a record with the same id.
    pub async fn record_notification(&self, user_id: &str, record: NotificationRecord) {
        let mut history = self.history.lock().await;
        let entries = history.entry(user_id.to_string()).or_default();
        entries.retain(|existing| existing.id != record.id);
        entries.insert(0, record);
        entries.truncate(HISTORY_CAPACITY);
    }

    pub async fn notification_history(&self, user_id: &str) -> Vec<NotificationRecord> {
        self.history
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Set one control and return all controls of the device.
    pub async fn apply_control(
        &self,
        device_id: &str,
        control_id: &str,
        value: f64,
        timestamp: &str,
    ) -> BTreeMap<String, ControlState> {
        let mut controls = self.controls.lock().await;
        let device = controls.entry(device_id.to_string()).or_default();
        device.insert(
            control_id.to_string(),
            ControlState {
                value,
                timestamp: timestamp.to_string(),
            },
        );
        device.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> NotificationRecord {
        NotificationRecord {
            id: id.to_string(),
            title: "Alarm".to_string(),
            message: "message".to_string(),
            device_id: None,
            device_name: None,
            alarm_id: None,
            kind: "alarm".to_string(),
            severity: None,
            triggered_at: "T".to_string(),
            created_at: "T".to_string(),
            is_read: false,
        }
    }

    #[tokio::test]
    async fn test_replaced_session_is_not_unregistered_by_old_socket() {
        // テスト項目: 置き換えられた古いセッションの切断で新しいセッションが消えない
        // given (前提条件):
        let state = AppState::default();
        let (old_tx, _old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        let old_session = state.register("42", old_tx).await;
        state.register("42", new_tx).await;

        // when (操作):
        state.unregister("42", old_session).await;
        let delivered = state
            .push_to(
                "42",
                &ServerMessage::Ping {
                    timestamp: "T".to_string(),
                },
            )
            .await;

        // then (期待する結果):
        assert!(delivered);
        assert!(state.is_connected("42").await);
        assert_eq!(
            new_rx.recv().await.as_deref(),
            Some(r#"{"type":"ping","timestamp":"T"}"#)
        );
    }

    #[tokio::test]
    async fn test_push_to_unknown_user_is_not_delivered() {
        // given (前提条件):
        let state = AppState::default();

        // when (操作):
        let delivered = state
            .push_to(
                "nobody",
                &ServerMessage::Ping {
                    timestamp: "T".to_string(),
                },
            )
            .await;

        // then (期待する結果):
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_without_duplicates() {
        // テスト項目: 履歴は新しい順で、同じ id は置き換えられる
        // given (前提条件):
        let state = AppState::default();

        // when (操作):
        state.record_notification("42", record("a")).await;
        state.record_notification("42", record("b")).await;
        state.record_notification("42", record("a")).await;

        // then (期待する結果):
        let ids: Vec<String> = state
            .notification_history("42")
            .await
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(state.notification_history("7").await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_control_merges_into_device() {
        // given (前提条件):
        let state = AppState::default();
        state.apply_control("7", "v1", 1.0, "T1").await;

        // when (操作):
        let controls = state.apply_control("7", "v2", 20.0, "T2").await;

        // then (期待する結果):
        assert_eq!(controls.len(), 2);
        assert_eq!(controls["v1"].value, 1.0);
        assert_eq!(controls["v2"].timestamp, "T2");
    }
}
