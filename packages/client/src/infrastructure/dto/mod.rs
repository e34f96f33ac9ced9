//! Data Transfer Objects (DTOs) of the event socket and the REST backend.
//!
//! - `websocket`: inbound and outbound socket frames, and frame decoding
//! - `conversion`: validation of inbound DTOs into domain types

pub mod conversion;
pub mod websocket;
