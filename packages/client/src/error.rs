//! Error types for the devicehub client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Identity is missing its user id or email
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Client configuration could not be applied
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconnection attempts were exhausted
    #[error("Connection problem: gave up after {0} reconnection attempts")]
    ConnectionProblem(u32),

    /// REST backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by a notification store
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store refused the write for lack of space
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    /// I/O error
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Classify an I/O error, mapping "disk full" conditions to [`StorageError::QuotaExceeded`].
    pub fn from_io(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded => {
                Self::QuotaExceeded
            }
            _ => Self::Io(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_full_maps_to_quota_exceeded() {
        // テスト項目: ディスク容量不足の I/O エラーが QuotaExceeded に分類される
        // given (前提条件):
        let error = std::io::Error::from(std::io::ErrorKind::StorageFull);

        // when (操作):
        let result = StorageError::from_io(error);

        // then (期待する結果):
        assert!(matches!(result, StorageError::QuotaExceeded));
    }

    #[test]
    fn test_other_io_errors_are_kept() {
        // given (前提条件):
        let error = std::io::Error::from(std::io::ErrorKind::PermissionDenied);

        // when (操作):
        let result = StorageError::from_io(error);

        // then (期待する結果):
        assert!(matches!(result, StorageError::Io(_)));
    }
}
