//! Connection manager: the single entry point consumers talk to.
//!
//! The manager owns at most one supervisor task. The supervisor runs socket
//! sessions back to back, consults the [`Reconnector`] after every closure
//! and sleeps out the reconnect delay, racing it against the shutdown
//! signal. A new supervisor is only spawned after the previous one has been
//! signalled and awaited, so two sockets never coexist.

use std::{sync::Arc, time::Duration};

use devicehub_shared::time::{Clock, SystemClock};
use tokio::{
    sync::{Mutex, oneshot},
    task::JoinHandle,
};

use crate::{
    config::ConnectionConfig,
    domain::{
        CloseDecision, ConnectionPhase, DesktopNotifier, Identity, NotificationList,
        NotificationStore, ReconnectPolicy, Reconnector,
    },
    infrastructure::{
        BackendClient,
        dto::websocket::OutboundMessage,
        storage::{ThrottledPersister, load_notifications},
    },
    state::{LiveState, LiveStore},
};

use super::session::{
    OutboundSlot, SessionContext, SessionEnd, drive_socket, open_socket, send_outbound,
};

/// Close reason used when a new `connect` replaces the running socket
const REPLACED_REASON: &str = "replaced";

struct SupervisorHandle {
    shutdown: oneshot::Sender<String>,
    task: JoinHandle<()>,
    history: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    async fn stop(self, live: &LiveStore, reason: &str) {
        live.set_phase(ConnectionPhase::Closing);
        if let Some(history) = self.history {
            history.abort();
        }
        // the supervisor may already have finished on its own
        let _ = self.shutdown.send(reason.to_string());
        if let Err(e) = self.task.await {
            tracing::warn!("Connection supervisor ended abnormally: {}", e);
        }
    }
}

/// Real-time connection manager
///
/// ## Example
///
/// ```ignore
/// let manager = ConnectionManager::new(config, store, notifier, Some(backend));
/// manager.restore_notifications().await;
/// manager.connect(Identity::new("42", "ops@example.com")?).await;
/// let mut rx = manager.store().subscribe();
/// ```
pub struct ConnectionManager {
    config: ConnectionConfig,
    live: LiveStore,
    storage: Arc<dyn NotificationStore>,
    notifier: Arc<dyn DesktopNotifier>,
    persister: Arc<ThrottledPersister>,
    backend: Option<BackendClient>,
    clock: Arc<dyn Clock>,
    outbound: OutboundSlot,
    supervisor: Mutex<Option<SupervisorHandle>>,
}

impl ConnectionManager {
    /// Create a manager in the `Idle` phase.
    ///
    /// Must be called inside a tokio runtime: the notification persister is
    /// spawned immediately.
    ///
    /// # Arguments
    ///
    /// * `config` - Socket, retry and notification settings
    /// * `storage` - Where the notification list is persisted
    /// * `notifier` - Desktop notification sink
    /// * `backend` - REST client for notification history, if any
    pub fn new(
        config: ConnectionConfig,
        storage: Arc<dyn NotificationStore>,
        notifier: Arc<dyn DesktopNotifier>,
        backend: Option<BackendClient>,
    ) -> Self {
        let notifications = NotificationList::new(
            config.notifications.capacity,
            config.notifications.duplicate_window,
        );
        let live = LiveStore::new(LiveState {
            notifications,
            ..LiveState::default()
        });
        let persister = ThrottledPersister::spawn(
            storage.clone(),
            config.notifications.persisted_capacity,
            config.notifications.persist_throttle,
        );

        Self {
            config,
            live,
            storage,
            notifier,
            persister: Arc::new(persister),
            backend,
            clock: Arc::new(SystemClock),
            outbound: OutboundSlot::default(),
            supervisor: Mutex::new(None),
        }
    }

    /// Replace the clock used for outbound and default timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Observable state
    pub fn store(&self) -> &LiveStore {
        &self.live
    }

    /// Merge persisted notifications into the list.
    ///
    /// Returns how many entries were added. Corrupt stored data is discarded.
    pub async fn restore_notifications(&self) -> usize {
        let restored = load_notifications(self.storage.as_ref()).await;
        self.live.update_if(|state| {
            let added = state.notifications.merge_history(restored);
            (added > 0, added)
        })
    }

    /// Open the event socket for `identity`.
    ///
    /// Any running socket is closed with reason "replaced" first and a pending
    /// reconnect is cancelled. The connection-problem flag and the retry
    /// counter start over. When a backend is configured, the notification
    /// history is fetched in the background.
    pub async fn connect(&self, identity: Identity) {
        let mut supervisor = self.supervisor.lock().await;
        if let Some(previous) = supervisor.take() {
            tracing::info!("Replacing the current connection");
            previous.stop(&self.live, REPLACED_REASON).await;
        }

        self.live.update(|state| {
            state.phase = ConnectionPhase::Connecting;
            state.connection_problem = false;
            state.reconnect_attempts = 0;
        });

        let url = identity.socket_url(&self.config.ws_base_url);
        tracing::info!("Connecting to {} as '{}'", url, identity.email());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(
            url,
            self.config.reconnect,
            self.config.connect_timeout,
            self.session_context(),
            shutdown_rx,
        ));
        let history = self.backend.clone().map(|backend| {
            tokio::spawn(fetch_history(
                backend,
                identity.user_id().to_string(),
                self.live.clone(),
                self.persister.clone(),
            ))
        });

        *supervisor = Some(SupervisorHandle {
            shutdown: shutdown_tx,
            task,
            history,
        });
    }

    /// Close the socket for good and forget the identity.
    ///
    /// Cancels any pending reconnect before closing with code 1000 and flushes
    /// pending notification writes.
    pub async fn close(&self, reason: &str) {
        let handle = self.supervisor.lock().await.take();
        if let Some(handle) = handle {
            handle.stop(&self.live, reason).await;
            self.live.set_phase(ConnectionPhase::Closed);
        }
        self.persister.flush().await;
    }

    /// Send a `device_command` frame.
    ///
    /// Returns `false` without sending when the socket is not open.
    pub fn send_command(
        &self,
        device_id: &str,
        control_id: &str,
        command_type: &str,
        value: f64,
    ) -> bool {
        self.send(OutboundMessage::DeviceCommand {
            device_id: device_id.to_string(),
            control_id: control_id.to_string(),
            command_type: command_type.to_string(),
            value,
            timestamp: self.clock.now_rfc3339(),
        })
    }

    /// Send a diagnostic `echo` frame; `false` when the socket is not open.
    pub fn send_echo(&self, message: &str) -> bool {
        self.send(OutboundMessage::Echo {
            message: message.to_string(),
            timestamp: self.clock.now_rfc3339(),
        })
    }

    fn send(&self, message: OutboundMessage) -> bool {
        if self.live.phase() != ConnectionPhase::Open {
            tracing::warn!("Socket is not open; dropping outbound message");
            return false;
        }
        send_outbound(&self.outbound, message)
    }

    pub fn remove_notification(&self, id: &str) -> bool {
        let removed = self.live.update_if(|state| {
            let removed = state.notifications.remove(id);
            (removed, removed)
        });
        if removed {
            self.schedule_persist();
        }
        removed
    }

    pub fn clear_notifications(&self) {
        let cleared = self.live.update_if(|state| {
            let had_items = !state.notifications.is_empty();
            state.notifications.clear();
            (had_items, had_items)
        });
        if cleared {
            self.schedule_persist();
        }
    }

    /// Mark one notification read; `false` when unknown or already read.
    pub fn mark_notification_read(&self, id: &str) -> bool {
        let marked = self.live.update_if(|state| {
            let marked = state.notifications.mark_read(id);
            (marked, marked)
        });
        if marked {
            self.schedule_persist();
        }
        marked
    }

    /// Mark every notification read, returning how many changed.
    pub fn mark_all_read(&self) -> usize {
        let marked = self.live.update_if(|state| {
            let marked = state.notifications.mark_all_read();
            (marked > 0, marked)
        });
        if marked > 0 {
            self.schedule_persist();
        }
        marked
    }

    fn schedule_persist(&self) {
        self.persister.schedule(&self.live.notifications());
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            store: self.live.clone(),
            notifier: self.notifier.clone(),
            persister: self.persister.clone(),
            clock: self.clock.clone(),
            outbound: self.outbound.clone(),
            max_message_chars: self.config.max_message_chars,
        }
    }
}

/// Run sessions until shutdown, a normal closure, or exhausted retries.
async fn supervise(
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    ctx: SessionContext,
    mut shutdown: oneshot::Receiver<String>,
) {
    let mut reconnector = Reconnector::new(policy);
    reconnector.connect_requested();

    loop {
        ctx.store.set_phase(reconnector.phase());

        let end = match open_socket(&url, connect_timeout, &mut shutdown).await {
            Ok(socket) => {
                reconnector.on_open();
                ctx.store.update(|state| {
                    state.phase = ConnectionPhase::Open;
                    state.reconnect_attempts = 0;
                });
                tracing::info!("Connected to {}", url);
                drive_socket(socket, &ctx, &mut shutdown).await
            }
            Err(end) => end,
        };

        let event = match end {
            SessionEnd::Closed(event) => event,
            SessionEnd::Shutdown(reason) => {
                tracing::info!("Connection closed ({})", reason);
                reconnector.close_requested();
                ctx.store.set_phase(ConnectionPhase::Closed);
                return;
            }
        };

        match reconnector.on_close(&event) {
            CloseDecision::Stop => {
                tracing::info!("Connection closed by server ({} {})", event.code, event.reason);
                ctx.store.set_phase(ConnectionPhase::Closed);
                return;
            }
            CloseDecision::Reconnect { delay, attempt } => {
                tracing::info!(
                    "Reconnecting in {:?} (attempt {}/{})",
                    delay,
                    attempt,
                    policy.max_attempts
                );
                ctx.store.update(|state| {
                    state.phase = ConnectionPhase::Closed;
                    state.reconnect_attempts = attempt;
                });
                tokio::select! {
                    _ = tokio::time::sleep(delay) => reconnector.retry_started(),
                    reason = &mut shutdown => {
                        tracing::info!(
                            "Pending reconnect cancelled ({})",
                            reason.unwrap_or_else(|_| "client dropped".to_string())
                        );
                        reconnector.log_out();
                        return;
                    }
                }
            }
            CloseDecision::Exhausted { attempts } => {
                tracing::error!(
                    "Failed to reconnect after {} attempts; giving up",
                    attempts
                );
                ctx.store.update(|state| {
                    state.phase = ConnectionPhase::Closed;
                    state.connection_problem = true;
                    state.reconnect_attempts = attempts;
                });
                return;
            }
        }
    }
}

async fn fetch_history(
    backend: BackendClient,
    user_id: String,
    live: LiveStore,
    persister: Arc<ThrottledPersister>,
) {
    match backend.fetch_notifications(&user_id).await {
        Ok(history) => {
            let added = live.update_if(|state| {
                let added = state.notifications.merge_history(history);
                (added > 0, added)
            });
            tracing::info!("Merged {} notifications from history", added);
            if added > 0 {
                persister.schedule(&live.notifications());
            }
        }
        Err(e) => tracing::warn!("Failed to fetch notification history: {}", e),
    }
}
