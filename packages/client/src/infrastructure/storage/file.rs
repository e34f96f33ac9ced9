//! File-backed notification store.
//!
//! The whole value lives in one JSON file. Writes go to a sibling temporary
//! file which is then renamed over the target, so a crash mid-write never
//! leaves a truncated value behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{domain::NotificationStore, error::StorageError};

/// Stores the notification list in a single file
#[derive(Debug, Clone)]
pub struct FileNotificationStore {
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl FileNotificationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
        }
    }

    /// Reject values larger than `quota_bytes` as if the disk were full
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl NotificationStore for FileNotificationStore {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // not UTF-8: report as a value the decoder will reject
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Ok(Some(String::new())),
            Err(e) => Err(StorageError::from_io(e)),
        }
    }

    async fn save(&self, value: &str) -> Result<(), StorageError> {
        if self.quota_bytes.is_some_and(|quota| value.len() > quota) {
            return Err(StorageError::QuotaExceeded);
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::from_io)?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, value)
            .await
            .map_err(StorageError::from_io)?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(StorageError::from_io)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_as_none() {
        // テスト項目: ファイルが存在しない場合は None が返る
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store = FileNotificationStore::new(dir.path().join("notifications.json"));

        // when (操作):
        let result = store.load().await.unwrap();

        // then (期待する結果):
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories_and_round_trips() {
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notifications.json");
        let store = FileNotificationStore::new(&path);

        // when (操作):
        store.save(r#"[{"id":"a"}]"#).await.unwrap();

        // then (期待する結果):
        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(
            store.load().await.unwrap().as_deref(),
            Some(r#"[{"id":"a"}]"#)
        );
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store = FileNotificationStore::new(dir.path().join("notifications.json"));
        store.save("[]").await.unwrap();

        // when (操作):
        store.clear().await.unwrap();
        let second = store.clear().await;

        // then (期待する結果):
        assert!(second.is_ok());
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let store = FileNotificationStore::new(dir.path().join("n.json")).with_quota(2);

        // when (操作):
        let result = store.save("[1]").await;

        // then (期待する結果):
        assert!(matches!(result, Err(StorageError::QuotaExceeded)));
    }
}
