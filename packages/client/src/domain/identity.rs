//! Logged-in identity used to open the event socket.

use crate::error::ClientError;

/// The user a socket is opened for.
///
/// Both fields are required; an identity can only be built through
/// [`Identity::new`], which trims and validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user_id: String,
    email: String,
}

impl Identity {
    /// Create a new identity.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidIdentity`] when the user id or the email is
    /// empty, or when the user id cannot be used as a URL path segment.
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Result<Self, ClientError> {
        let user_id = user_id.into().trim().to_string();
        let email = email.into().trim().to_string();

        if user_id.is_empty() {
            return Err(ClientError::InvalidIdentity("user id is empty".to_string()));
        }
        if email.is_empty() {
            return Err(ClientError::InvalidIdentity("email is empty".to_string()));
        }
        if user_id
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'))
        {
            return Err(ClientError::InvalidIdentity(format!(
                "user id '{}' is not a valid path segment",
                user_id
            )));
        }

        Ok(Self { user_id, email })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Socket endpoint for this identity: `{base}/{user_id}`.
    pub fn socket_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_trims_fields() {
        // テスト項目: 前後の空白が取り除かれる
        // given (前提条件):
        let user_id = "  42 ";
        let email = " ops@example.com";

        // when (操作):
        let identity = Identity::new(user_id, email).unwrap();

        // then (期待する結果):
        assert_eq!(identity.user_id(), "42");
        assert_eq!(identity.email(), "ops@example.com");
    }

    #[test]
    fn test_identity_rejects_empty_user_id() {
        // テスト項目: user id が空の場合はエラーになる
        // given (前提条件):
        let user_id = "   ";

        // when (操作):
        let result = Identity::new(user_id, "ops@example.com");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidIdentity(_))));
    }

    #[test]
    fn test_identity_rejects_empty_email() {
        // given (前提条件):
        let email = "";

        // when (操作):
        let result = Identity::new("42", email);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidIdentity(_))));
    }

    #[test]
    fn test_identity_rejects_path_separators() {
        // given (前提条件):
        let user_id = "42/../admin";

        // when (操作):
        let result = Identity::new(user_id, "ops@example.com");

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_socket_url_appends_user_id() {
        // テスト項目: ベース URL の末尾スラッシュに関係なく user id が付与される
        // given (前提条件):
        let identity = Identity::new("42", "ops@example.com").unwrap();

        // when (操作):
        let with_slash = identity.socket_url("ws://127.0.0.1:8080/ws/");
        let without_slash = identity.socket_url("ws://127.0.0.1:8080/ws");

        // then (期待する結果):
        assert_eq!(with_slash, "ws://127.0.0.1:8080/ws/42");
        assert_eq!(without_slash, "ws://127.0.0.1:8080/ws/42");
    }
}
