//! Terminal dashboard for devicehub.
//!
//! Opens the real-time socket for a user, renders device status, control
//! values and alarms as they arrive, and accepts line commands to change
//! controls and manage notifications.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin devicehub-client -- --user-id 42 --email ops@example.com
//! cargo run --bin devicehub-client -- -i 42 -e ops@example.com --storage /tmp/alarms.json
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use devicehub_client::{
    config::{ConnectionConfig, DEFAULT_API_BASE_URL, DEFAULT_WS_BASE_URL},
    connection::ConnectionManager,
    domain::{Identity, NotificationPermission},
    error::ClientError,
    infrastructure::{BackendClient, TerminalNotifier, storage::FileNotificationStore},
    ui::run_dashboard,
};
use devicehub_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "devicehub-client")]
#[command(about = "Terminal dashboard for the devicehub real-time API", long_about = None)]
struct Args {
    /// User id the socket is opened for
    #[arg(short = 'i', long)]
    user_id: String,

    /// Email of the logged-in user
    #[arg(short = 'e', long)]
    email: String,

    /// WebSocket base URL; the user id is appended
    #[arg(short = 'u', long, default_value = DEFAULT_WS_BASE_URL)]
    ws_url: String,

    /// REST API base URL used for notification history
    #[arg(short = 'a', long, default_value = DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Bearer token for the REST API
    #[arg(short = 't', long)]
    token: Option<String>,

    /// File holding the persisted notification list
    #[arg(short = 's', long, default_value = "devicehub-notifications.json")]
    storage: PathBuf,

    /// Do not ring the terminal bell for new alarms
    #[arg(long)]
    no_desktop_notifications: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let identity = Identity::new(args.user_id, args.email)?;
    let backend = BackendClient::new(args.api_url, args.token.as_deref())?;
    let permission = if args.no_desktop_notifications {
        NotificationPermission::Denied
    } else {
        NotificationPermission::Granted
    };

    let manager = Arc::new(ConnectionManager::new(
        ConnectionConfig::new(args.ws_url),
        Arc::new(FileNotificationStore::new(args.storage)),
        Arc::new(TerminalNotifier::new(permission)),
        Some(backend),
    ));
    let restored = manager.restore_notifications().await;
    tracing::info!("Restored {} notifications", restored);

    run_dashboard(manager, identity).await
}
