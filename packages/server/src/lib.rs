//! Development backend for the devicehub real-time client.
//!
//! Speaks the same socket protocol and notification-history endpoint as the
//! production backend, closely enough to drive the client end to end in
//! tests and local demos.

pub mod error;
pub mod protocol;
pub mod ui;
