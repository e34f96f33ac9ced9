//! One WebSocket session: open, pump frames, close.
//!
//! A session owns the socket exclusively. Inbound text frames are decoded and
//! reduced in delivery order on the session task; outbound frames arrive over
//! an unbounded channel registered in the shared outbound slot while the
//! socket is open.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use devicehub_shared::time::Clock;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::protocol::{CloseFrame, Message, frame::coding::CloseCode},
};

use crate::{
    domain::{CloseEvent, DesktopNotifier, NotificationPermission},
    infrastructure::{
        dto::websocket::{OutboundMessage, decode_server_event},
        storage::ThrottledPersister,
    },
    state::{Effect, LiveStore, Reduction, reducer::reduce},
};

pub(crate) type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sender half of the open socket, if any
pub(crate) type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<OutboundMessage>>>>;

/// Close code reported when the peer sent a close frame without a status
const NO_STATUS_RECEIVED: u16 = 1005;

/// Shared collaborators of every session
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub store: LiveStore,
    pub notifier: Arc<dyn DesktopNotifier>,
    pub persister: Arc<ThrottledPersister>,
    pub clock: Arc<dyn Clock>,
    pub outbound: OutboundSlot,
    pub max_message_chars: usize,
}

/// Why a session stopped
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// The socket closed or never opened
    Closed(CloseEvent),
    /// Local shutdown was requested with this reason
    Shutdown(String),
}

/// Open `url`, giving up after `timeout`.
///
/// A timeout or handshake failure is reported as an abnormal closure.
pub(crate) async fn open_socket(
    url: &str,
    timeout: Duration,
    shutdown: &mut oneshot::Receiver<String>,
) -> Result<Socket, SessionEnd> {
    tokio::select! {
        result = tokio::time::timeout(timeout, connect_async(url)) => match result {
            Ok(Ok((socket, _response))) => Ok(socket),
            Ok(Err(e)) => {
                tracing::warn!("Failed to connect to {}: {}", url, e);
                Err(SessionEnd::Closed(CloseEvent::abnormal(e.to_string())))
            }
            Err(_) => {
                tracing::warn!("Connecting to {} timed out after {:?}", url, timeout);
                Err(SessionEnd::Closed(CloseEvent::abnormal("connect timeout")))
            }
        },
        reason = shutdown => Err(SessionEnd::Shutdown(shutdown_reason(reason))),
    }
}

/// Pump frames until the socket closes or shutdown is requested.
pub(crate) async fn drive_socket(
    socket: Socket,
    ctx: &SessionContext,
    shutdown: &mut oneshot::Receiver<String>,
) -> SessionEnd {
    let (mut write, mut read) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    set_outbound(&ctx.outbound, Some(outbound_tx));

    let end = loop {
        tokio::select! {
            reason = &mut *shutdown => {
                let reason = shutdown_reason(reason);
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: reason.clone().into(),
                };
                if let Err(e) = write.send(Message::Close(Some(frame))).await {
                    tracing::debug!("Failed to send close frame: {}", e);
                }
                break SessionEnd::Shutdown(reason);
            }
            Some(message) = outbound_rx.recv() => {
                if let Err(event) = write_message(&mut write, &message).await {
                    break SessionEnd::Closed(event);
                }
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let mut failed = None;
                    for reply in dispatch_inbound(ctx, text.as_str()) {
                        if let Err(event) = write_message(&mut write, &reply).await {
                            failed = Some(event);
                            break;
                        }
                    }
                    if let Some(event) = failed {
                        break SessionEnd::Closed(event);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let event = match frame {
                        Some(frame) => CloseEvent::new(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseEvent::new(NO_STATUS_RECEIVED, ""),
                    };
                    tracing::info!("Server closed the connection ({} {})", event.code, event.reason);
                    break SessionEnd::Closed(event);
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!("Ignoring binary frame of {} bytes", data.len());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    break SessionEnd::Closed(CloseEvent::abnormal(e.to_string()));
                }
                None => break SessionEnd::Closed(CloseEvent::abnormal("connection lost")),
            },
        }
    };

    set_outbound(&ctx.outbound, None);
    end
}

async fn write_message(
    write: &mut SplitSink<Socket, Message>,
    message: &OutboundMessage,
) -> Result<(), CloseEvent> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {}", e);
            return Ok(());
        }
    };
    write.send(Message::Text(json.into())).await.map_err(|e| {
        tracing::warn!("Failed to send message: {}", e);
        CloseEvent::abnormal(e.to_string())
    })
}

/// Decode, reduce and apply one inbound frame, returning frames to send back.
///
/// Frames that fail to decode are logged and dropped.
pub(crate) fn dispatch_inbound(ctx: &SessionContext, raw: &str) -> Vec<OutboundMessage> {
    let event = match decode_server_event(raw, ctx.max_message_chars) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Discarding inbound frame: {}", e);
            return Vec::new();
        }
    };
    tracing::debug!("Received '{}'", event.kind());

    let now = ctx.clock.now_rfc3339();
    let reduction: Reduction = ctx.store.update_if(|state| {
        let reduction = reduce(state, event, &now);
        (reduction.changed, reduction)
    });

    let mut replies = Vec::new();
    for effect in reduction.effects {
        match effect {
            Effect::Pong { timestamp } => replies.push(OutboundMessage::Pong { timestamp }),
            Effect::DesktopNotify { title, body } => {
                if ctx.notifier.permission() == NotificationPermission::Granted {
                    ctx.notifier.show(&title, &body);
                }
            }
            Effect::PersistNotifications(notifications) => ctx.persister.schedule(&notifications),
        }
    }
    replies
}

pub(crate) fn set_outbound(
    slot: &OutboundSlot,
    sender: Option<mpsc::UnboundedSender<OutboundMessage>>,
) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = sender;
}

/// Send through the open socket; false when none is open.
pub(crate) fn send_outbound(slot: &OutboundSlot, message: OutboundMessage) -> bool {
    slot.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|tx| tx.send(message).is_ok())
}

fn shutdown_reason(received: Result<String, oneshot::error::RecvError>) -> String {
    received.unwrap_or_else(|_| "client dropped".to_string())
}

#[cfg(test)]
mod tests {
    use devicehub_shared::time::FixedClock;
    use mockall::predicate::eq;

    use super::*;
    use crate::{
        domain::{MockDesktopNotifier, NotificationStore},
        infrastructure::storage::InMemoryNotificationStore,
    };

    const ALARM: &str = r#"{"type":"alarm_notification","data":{"id":"a1","title":"Boiler","message":"Pressure high","device_id":"7"}}"#;

    fn context(notifier: MockDesktopNotifier) -> (SessionContext, Arc<InMemoryNotificationStore>) {
        let storage = Arc::new(InMemoryNotificationStore::new());
        let persister = ThrottledPersister::spawn(
            storage.clone() as Arc<dyn NotificationStore>,
            30,
            Duration::from_secs(1),
        );
        let ctx = SessionContext {
            store: LiveStore::default(),
            notifier: Arc::new(notifier),
            persister: Arc::new(persister),
            clock: Arc::new(FixedClock::new(1_714_557_600_000)),
            outbound: Arc::new(Mutex::new(None)),
            max_message_chars: 50_000,
        };
        (ctx, storage)
    }

    #[tokio::test]
    async fn test_ping_produces_pong_reply() {
        // テスト項目: ping に対して現在時刻付きの pong を返す
        // given (前提条件):
        let (ctx, _) = context(MockDesktopNotifier::new());

        // when (操作):
        let replies = dispatch_inbound(&ctx, r#"{"type":"ping"}"#);

        // then (期待する結果):
        assert_eq!(
            replies,
            vec![OutboundMessage::Pong {
                timestamp: "2024-05-01T10:00:00.000Z".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_alarm_shows_desktop_notification_when_granted() {
        // テスト項目: 許可されている場合はデスクトップ通知を表示する
        // given (前提条件):
        let mut notifier = MockDesktopNotifier::new();
        notifier
            .expect_permission()
            .return_const(NotificationPermission::Granted);
        notifier
            .expect_show()
            .with(eq("Boiler"), eq("Pressure high"))
            .times(1)
            .return_const(());
        let (ctx, _) = context(notifier);

        // when (操作):
        let replies = dispatch_inbound(&ctx, ALARM);

        // then (期待する結果):
        assert!(replies.is_empty());
        assert_eq!(ctx.store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_alarm_without_permission_is_not_shown() {
        // given (前提条件):
        let mut notifier = MockDesktopNotifier::new();
        notifier
            .expect_permission()
            .return_const(NotificationPermission::Denied);
        notifier.expect_show().never();
        let (ctx, _) = context(notifier);

        // when (操作):
        dispatch_inbound(&ctx, ALARM);

        // then (期待する結果):
        assert_eq!(ctx.store.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_alarm_notifies_once() {
        // テスト項目: 同じ id のアラームは一度だけ通知される
        // given (前提条件):
        let mut notifier = MockDesktopNotifier::new();
        notifier
            .expect_permission()
            .times(1)
            .return_const(NotificationPermission::Granted);
        notifier.expect_show().times(1).return_const(());
        let (ctx, _) = context(notifier);

        // when (操作):
        dispatch_inbound(&ctx, ALARM);
        dispatch_inbound(&ctx, ALARM);

        // then (期待する結果):
        assert_eq!(ctx.store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_alarm_is_persisted_after_flush() {
        // テスト項目: 受信した通知はストレージに保存される
        // given (前提条件):
        let mut notifier = MockDesktopNotifier::new();
        notifier
            .expect_permission()
            .return_const(NotificationPermission::Default);
        let (ctx, storage) = context(notifier);

        // when (操作):
        dispatch_inbound(&ctx, ALARM);
        ctx.persister.flush().await;

        // then (期待する結果):
        let stored = storage.value().await.expect("value should be stored");
        assert!(stored.contains("\"a1\""));
    }

    #[tokio::test]
    async fn test_invalid_frames_are_dropped() {
        // テスト項目: 不正なフレームは状態を変更せずに破棄される
        // given (前提条件):
        let (ctx, _) = context(MockDesktopNotifier::new());
        let mut rx = ctx.store.subscribe();
        let oversized = format!(
            r#"{{"type":"status_update","device_id":"7","status":"{}"}}"#,
            "x".repeat(50_001)
        );

        // when (操作):
        let replies: Vec<_> = [
            "not json",
            r#"{"type":"sensor_update","device_id":"7","datastream_id":"v1"}"#,
            r#"{"type":"alarm_notification","data":{"title":"no id"}}"#,
            oversized.as_str(),
        ]
        .iter()
        .flat_map(|raw| dispatch_inbound(&ctx, raw))
        .collect();

        // then (期待する結果):
        assert!(replies.is_empty());
        assert!(!rx.has_changed().expect("store should be alive"));
    }

    #[tokio::test]
    async fn test_send_outbound_requires_open_slot() {
        // given (前提条件):
        let slot: OutboundSlot = Arc::new(Mutex::new(None));
        let message = OutboundMessage::Echo {
            message: "hi".to_string(),
            timestamp: "T".to_string(),
        };

        // when (操作):
        let without_socket = send_outbound(&slot, message.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        set_outbound(&slot, Some(tx));
        let with_socket = send_outbound(&slot, message.clone());

        // then (期待する結果):
        assert!(!without_socket);
        assert!(with_socket);
        assert_eq!(rx.recv().await, Some(message));
    }
}
