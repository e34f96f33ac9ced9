//! In-memory notification store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{domain::NotificationStore, error::StorageError};

/// Keeps the stored value in memory; an optional byte quota emulates a
/// size-limited key-value backend.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    value: Mutex<Option<String>>,
    quota_bytes: Option<usize>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects values larger than `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            value: Mutex::new(None),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Store pre-filled with `value`
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
            quota_bytes: None,
        }
    }

    /// Current stored value
    pub async fn value(&self) -> Option<String> {
        self.value.lock().await.clone()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.value.lock().await.clone())
    }

    async fn save(&self, value: &str) -> Result<(), StorageError> {
        if self.quota_bytes.is_some_and(|quota| value.len() > quota) {
            return Err(StorageError::QuotaExceeded);
        }
        *self.value.lock().await = Some(value.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.value.lock().await = None;
        Ok(())
    }
}
