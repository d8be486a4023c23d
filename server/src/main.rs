use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use quadpong_server::config::ServerConfig;
use quadpong_server::game_loop::{run_game_loop, GameCommand};
use quadpong_server::ws::{ws_handler, AppState};
use tokio::sync::{mpsc, Semaphore};
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

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
    let max_connections = config.max_connections;
    let max_message_bytes = config.max_message_bytes;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let ticks = game_tx.downgrade();

    // Spawn game loop
    tokio::spawn(async move {
        run_game_loop(game_rx, ticks, config).await;
    });

    // Axum app
    let app_state = AppState {
        game_tx,
        connection_semaphore: Arc::new(Semaphore::new(max_connections)),
        max_message_bytes,
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting quadpong server on {}", listen_addr);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
