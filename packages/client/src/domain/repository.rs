//! Persistence port for the notification history.
//!
//! The store holds a single value (a JSON array) under one key. Decoding,
//! capping and throttling are handled by `infrastructure::storage`, so an
//! implementation only has to move strings in and out of a key-value backend.

use async_trait::async_trait;

use crate::error::StorageError;

/// Key-value backed storage for the serialized notification list
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Read the stored value, `None` when nothing has been stored
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Overwrite the stored value
    async fn save(&self, value: &str) -> Result<(), StorageError>;

    /// Remove the stored value
    async fn clear(&self) -> Result<(), StorageError>;
}
