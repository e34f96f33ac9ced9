//! Throttled writer of the notification list.
//!
//! Bursts of alarms would otherwise rewrite the store once per message. The
//! persister runs as a background task: the first scheduled snapshot arms a
//! deadline one throttle window away, later snapshots within the window only
//! replace the pending one, and a single write happens at the deadline.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use crate::{
    domain::{Notification, NotificationStore},
    error::StorageError,
};

enum PersistRequest {
    Snapshot(Vec<Notification>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background persistence task
#[derive(Debug)]
pub struct ThrottledPersister {
    tx: mpsc::UnboundedSender<PersistRequest>,
    capacity: usize,
}

impl std::fmt::Debug for PersistRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(items) => write!(f, "Snapshot({} items)", items.len()),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl ThrottledPersister {
    /// Spawn the persistence task on the current runtime.
    ///
    /// # Arguments
    ///
    /// * `store` - Destination of the serialized list
    /// * `capacity` - Newest entries written per snapshot
    /// * `window` - Coalescing window
    pub fn spawn(store: Arc<dyn NotificationStore>, capacity: usize, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(persist_loop(store, rx, window));
        Self { tx, capacity }
    }

    /// Schedule a write of the newest `capacity` entries of `notifications`.
    pub fn schedule(&self, notifications: &[Notification]) {
        let snapshot = notifications.iter().take(self.capacity).cloned().collect();
        if self.tx.send(PersistRequest::Snapshot(snapshot)).is_err() {
            tracing::warn!("Notification persister has stopped; dropping snapshot");
        }
    }

    /// Write any pending snapshot now and wait for it.
    ///
    /// Dropping the handle also writes the pending snapshot, without waiting.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(PersistRequest::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn persist_loop(
    store: Arc<dyn NotificationStore>,
    mut rx: mpsc::UnboundedReceiver<PersistRequest>,
    window: Duration,
) {
    let mut pending: Option<Vec<Notification>> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            request = rx.recv() => match request {
                Some(PersistRequest::Snapshot(snapshot)) => {
                    pending = Some(snapshot);
                    deadline.get_or_insert_with(|| Instant::now() + window);
                }
                Some(PersistRequest::Flush(ack)) => {
                    deadline = None;
                    if let Some(snapshot) = pending.take() {
                        write_snapshot(store.as_ref(), &snapshot).await;
                    }
                    let _ = ack.send(());
                }
                None => {
                    if let Some(snapshot) = pending.take() {
                        write_snapshot(store.as_ref(), &snapshot).await;
                    }
                    break;
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                if let Some(snapshot) = pending.take() {
                    write_snapshot(store.as_ref(), &snapshot).await;
                }
            }
        }
    }
}

/// Serialize and save one snapshot. A quota error clears the stored value.
async fn write_snapshot(store: &dyn NotificationStore, snapshot: &[Notification]) {
    let raw = match serde_json::to_string(snapshot) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!("Failed to serialize notifications: {}", e);
            return;
        }
    };

    match store.save(&raw).await {
        Ok(()) => tracing::trace!("Persisted {} notifications", snapshot.len()),
        Err(StorageError::QuotaExceeded) => {
            tracing::warn!("Storage quota exceeded; clearing stored notifications");
            if let Err(e) = store.clear().await {
                tracing::warn!("Failed to clear stored notifications: {}", e);
            }
        }
        Err(e) => tracing::warn!("Failed to persist notifications: {}", e),
    }
}
