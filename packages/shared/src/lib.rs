//! Utilities shared by the devicehub client and development backend.

pub mod logger;
pub mod time;
