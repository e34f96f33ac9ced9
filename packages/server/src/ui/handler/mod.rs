//! Request handlers.

mod http;
mod websocket;

pub use http::{get_notifications, health_check, post_alarm, post_device_sensor, post_device_status};
pub use websocket::websocket_handler;
