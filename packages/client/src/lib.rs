//! Real-time client library for the devicehub IoT dashboard.
//!
//! The [`connection::ConnectionManager`] keeps a single WebSocket per logged-in
//! identity, reduces pushed device and alarm messages into a
//! [`state::LiveStore`], and keeps a capped notification history on disk.

pub mod config;
pub mod error;

// layers
pub mod connection;
pub mod domain;
pub mod infrastructure;
pub mod state;
pub mod ui;
