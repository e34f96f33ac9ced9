//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use devicehub_shared::time::current_rfc3339;
use uuid::Uuid;

use crate::{
    error::ServerError,
    protocol::{
        AlarmRequest, HistoryQuery, NotificationRecord, PushResponse, SensorRequest,
        ServerMessage, StatusRequest,
    },
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Notification history of a user, newest first
pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<NotificationRecord>> {
    Json(state.notification_history(&query.user_id).await)
}

/// Record an alarm and push it to the user's socket
pub async fn post_alarm(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlarmRequest>,
) -> Result<(StatusCode, Json<PushResponse>), ServerError> {
    if request.user_id.trim().is_empty() {
        return Err(ServerError::InvalidRequest("user_id is required".to_string()));
    }

    let now = current_rfc3339();
    let record = NotificationRecord {
        id: request.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        title: request.title,
        message: request.message,
        device_id: request.device_id,
        device_name: request.device_name,
        alarm_id: request.alarm_id,
        kind: "alarm".to_string(),
        severity: request.severity,
        triggered_at: request.triggered_at.unwrap_or_else(|| now.clone()),
        created_at: now,
        is_read: false,
    };

    state.record_notification(&request.user_id, record.clone()).await;
    let delivered = state
        .push_to(
            &request.user_id,
            &ServerMessage::AlarmNotification {
                data: record.clone(),
            },
        )
        .await;
    tracing::info!(
        "Alarm '{}' for '{}' recorded (delivered: {})",
        record.id,
        request.user_id,
        delivered
    );

    Ok((
        StatusCode::CREATED,
        Json(PushResponse {
            delivered,
            notification: Some(record),
        }),
    ))
}

/// Push a `status_update` for a device to a connected user
pub async fn post_device_status(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<PushResponse>, ServerError> {
    let message = ServerMessage::StatusUpdate {
        device_id,
        status: request.status,
        timestamp: current_rfc3339(),
    };
    push_or_not_found(&state, &request.user_id, &message).await
}

/// Push a `sensor_update` for a device to a connected user
pub async fn post_device_sensor(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(request): Json<SensorRequest>,
) -> Result<Json<PushResponse>, ServerError> {
    let message = ServerMessage::SensorUpdate {
        device_id,
        datastream_id: request.datastream_id,
        value: request.value,
        timestamp: current_rfc3339(),
    };
    push_or_not_found(&state, &request.user_id, &message).await
}

async fn push_or_not_found(
    state: &AppState,
    user_id: &str,
    message: &ServerMessage,
) -> Result<Json<PushResponse>, ServerError> {
    if !state.push_to(user_id, message).await {
        return Err(ServerError::UserNotConnected(user_id.to_string()));
    }
    Ok(Json(PushResponse {
        delivered: true,
        notification: None,
    }))
}
