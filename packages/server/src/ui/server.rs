//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;

use super::{
    handler::{
        get_notifications, health_check, post_alarm, post_device_sensor, post_device_status,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::{AppState, ServerConfig},
};

/// Routes of the development backend
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws/{user_id}", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/notifications", get(get_notifications))
        .route("/api/alarms", post(post_alarm))
        .route("/api/devices/{device_id}/status", post(post_device_status))
        .route("/api/devices/{device_id}/sensors", post(post_device_sensor))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Development backend
///
/// # Example
///
/// ```ignore
/// let server = Server::new(ServerConfig::default());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Shared state, e.g. to push frames from tests
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Bind to `host:port` and serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), ServerError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("devicehub server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws/<user_id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
