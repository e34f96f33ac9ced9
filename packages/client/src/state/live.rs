//! Publish/subscribe container for the live client state.
//!
//! The store wraps a `tokio::sync::watch` channel. Consumers subscribe and
//! read slices through selectors; a burst of updates between two reads is
//! observed as its final state. Mutation is crate-private: only the reducer
//! and the connection manager write.

use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::watch;

use crate::domain::{
    ConnectionPhase, DeviceControlRecord, DeviceStatusRecord, Notification, NotificationList,
};

/// Everything the connection manager exposes to consumers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LiveState {
    pub phase: ConnectionPhase,
    /// Set once reconnection attempts are exhausted; cleared by the next `connect`
    pub connection_problem: bool,
    /// Reconnects since the last successful open
    pub reconnect_attempts: u32,
    pub device_status: BTreeMap<String, DeviceStatusRecord>,
    pub device_controls: BTreeMap<String, DeviceControlRecord>,
    pub notifications: NotificationList,
}

/// Shared handle to the observable [`LiveState`]
#[derive(Debug, Clone)]
pub struct LiveStore {
    tx: Arc<watch::Sender<LiveState>>,
}

impl Default for LiveStore {
    fn default() -> Self {
        Self::new(LiveState::default())
    }
}

impl LiveStore {
    pub fn new(initial: LiveState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Receiver notified after every state change
    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.tx.subscribe()
    }

    /// Clone of the whole current state
    pub fn snapshot(&self) -> LiveState {
        self.tx.borrow().clone()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.tx.borrow().phase
    }

    pub fn connection_problem(&self) -> bool {
        self.tx.borrow().connection_problem
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.tx.borrow().reconnect_attempts
    }

    pub fn device_status(&self, device_id: &str) -> Option<DeviceStatusRecord> {
        self.tx.borrow().device_status.get(device_id).cloned()
    }

    pub fn device_controls(&self, device_id: &str) -> Option<DeviceControlRecord> {
        self.tx.borrow().device_controls.get(device_id).cloned()
    }

    pub fn control_value(&self, device_id: &str, control_id: &str) -> Option<f64> {
        self.tx
            .borrow()
            .device_controls
            .get(device_id)
            .and_then(|record| record.value(control_id))
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.tx.borrow().notifications.as_slice().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.tx.borrow().notifications.unread_count()
    }

    /// Apply `f` and notify subscribers.
    pub(crate) fn update(&self, f: impl FnOnce(&mut LiveState)) {
        self.tx.send_modify(f);
    }

    /// Apply `f`, notifying subscribers only when it reports a change.
    pub(crate) fn update_if<R: Default>(&self, f: impl FnOnce(&mut LiveState) -> (bool, R)) -> R {
        let mut output = R::default();
        self.tx.send_if_modified(|state| {
            let (changed, result) = f(state);
            output = result;
            changed
        });
        output
    }

    pub(crate) fn set_phase(&self, phase: ConnectionPhase) {
        self.update_if(|state| (std::mem::replace(&mut state.phase, phase) != phase, ()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceStatus, DeviceStatusRecord};

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        // テスト項目: 購読者は状態の変更を受け取る
        // given (前提条件):
        let store = LiveStore::default();
        let mut rx = store.subscribe();

        // when (操作):
        store.update(|state| {
            state.device_status.insert(
                "7".to_string(),
                DeviceStatusRecord {
                    status: DeviceStatus::Online,
                    timestamp: "T1".to_string(),
                },
            );
        });

        // then (期待する結果):
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update();
        assert_eq!(state.device_status["7"].status, DeviceStatus::Online);
    }

    #[test]
    fn test_update_if_skips_notification_when_unchanged() {
        // テスト項目: 変更が無い場合は購読者に通知されない
        // given (前提条件):
        let store = LiveStore::default();
        let rx = store.subscribe();

        // when (操作):
        let result = store.update_if(|_| (false, 42));

        // then (期待する結果):
        assert_eq!(result, 42);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_set_phase_only_notifies_on_transition() {
        // given (前提条件):
        let store = LiveStore::default();
        let mut rx = store.subscribe();

        // when (操作):
        store.set_phase(ConnectionPhase::Connecting);
        let first = rx.has_changed().unwrap();
        rx.borrow_and_update();
        store.set_phase(ConnectionPhase::Connecting);

        // then (期待する結果):
        assert!(first);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.phase(), ConnectionPhase::Connecting);
    }
}
