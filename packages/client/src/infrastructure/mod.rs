//! Infrastructure layer: wire formats, storage backends, the REST client and
//! the desktop notifier.

pub mod backend;
pub mod dto;
pub mod notifier;
pub mod storage;

pub use backend::BackendClient;
pub use notifier::TerminalNotifier;
