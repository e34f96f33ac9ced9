//! Development backend for the devicehub dashboard.
//!
//! Accepts one WebSocket per user at `/ws/{user_id}`, pings it periodically,
//! answers device commands, and pushes alarms and status updates posted to
//! its HTTP API.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin devicehub-server
//! cargo run --bin devicehub-server -- --host 0.0.0.0 --port 3000 --ping-interval 10
//! ```

use std::time::Duration;

use clap::Parser;

use devicehub_server::ui::{Server, ServerConfig};
use devicehub_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "devicehub-server")]
#[command(about = "WebSocket and HTTP stub of the devicehub backend", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Seconds between JSON ping frames
    #[arg(long, default_value = "30")]
    ping_interval: u64,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let server = Server::new(ServerConfig {
        ping_interval: Duration::from_secs(args.ping_interval.max(1)),
    });
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
