//! Domain layer: socket-free types and rules of the real-time client.
//!
//! Everything here is synchronous and side-effect free, except for the port
//! traits that the infrastructure layer implements.

pub mod device;
pub mod event;
pub mod identity;
pub mod notification;
pub mod notifier;
pub mod reconnect;
pub mod repository;

pub use device::{ControlValue, DeviceControlRecord, DeviceStatus, DeviceStatusRecord};
pub use event::ServerEvent;
pub use identity::Identity;
pub use notification::{Notification, NotificationList};
pub use notifier::{DesktopNotifier, NotificationPermission};
pub use reconnect::{CloseDecision, CloseEvent, ConnectionPhase, ReconnectPolicy, Reconnector};
pub use repository::NotificationStore;

#[cfg(test)]
pub use notifier::MockDesktopNotifier;
#[cfg(test)]
pub use repository::MockNotificationStore;
