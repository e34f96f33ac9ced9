//! Socket lifecycle: the [`ConnectionManager`] and the per-socket session driver.

mod manager;
mod session;

pub use manager::ConnectionManager;
