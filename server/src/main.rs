use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tabletop_host::config::ServerConfig;
use tabletop_host::session_loop::{run_session_loop, HostBroadcast, HostCommand};
use tabletop_host::ws::{ws_handler, AppState};
use tokio::sync::{broadcast, mpsc, Semaphore};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();

    let (cmd_tx, cmd_rx) = mpsc::channel::<HostCommand>(config.command_queue_capacity);
    let (broadcast_tx, _) = broadcast::channel::<HostBroadcast>(config.broadcast_capacity);

    let app_state = AppState {
        cmd_tx,
        broadcast_tx: broadcast_tx.clone(),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
    };

    // Spawn session loop
    tokio::spawn(async move {
        run_session_loop(cmd_rx, broadcast_tx, config).await;
    });

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting tabletop host on {}", listen_addr);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await
}
