//! REST backend client.
//!
//! Thin wrapper over `reqwest` that adds the base URL, the bearer credential
//! and the JSON content type to every request. Only the notification-history
//! and health endpoints are consumed by the dashboard itself.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{domain::Notification, error::ClientError};

use super::dto::websocket::NotificationPayload;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// History endpoint responses: a bare array or `{ "notifications": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    List(Vec<NotificationPayload>),
    Wrapped { notifications: Vec<NotificationPayload> },
}

impl HistoryResponse {
    fn into_payloads(self) -> Vec<NotificationPayload> {
        match self {
            Self::List(items) | Self::Wrapped {
                notifications: items,
            } => items,
        }
    }
}

/// JSON client for the devicehub REST API
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url`, optionally authenticating with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] when the token is not a valid
    /// header value, or [`ClientError::Http`] when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: Option<&str>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ClientError::InvalidConfig(format!("invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET {base}{path}` with query parameters, decoding a JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        Self::decode(response).await
    }

    /// `POST {base}{path}` with a JSON body, decoding a JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }

    /// Backend liveness check (`GET /api/health`)
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        self.get_json("/api/health", &[]).await
    }

    /// Notification history of a user, newest first.
    ///
    /// Records without an id are skipped.
    pub async fn fetch_notifications(&self, user_id: &str) -> Result<Vec<Notification>, ClientError> {
        let response: HistoryResponse = self
            .get_json("/api/notifications", &[("user_id", user_id)])
            .await?;

        let payloads = response.into_payloads();
        let total = payloads.len();
        let notifications: Vec<Notification> = payloads
            .into_iter()
            .filter_map(|payload| Notification::try_from(payload).ok())
            .collect();
        if notifications.len() != total {
            tracing::debug!(
                "Skipped {} history records without an id",
                total - notifications.len()
            );
        }
        Ok(notifications)
    }
}
