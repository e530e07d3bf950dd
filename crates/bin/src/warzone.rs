//! Warzone - game server that also hosts the static web client.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Request, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{future, SinkExt, StreamExt};
use server::{ConnectionSlot, ConnectionState, GameState, Inbound};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    game_state: Arc<RwLock<GameState>>,
    connections: Arc<ConnectionState>,
    static_files: ServeDir,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Snake Warzone v{}", env!("CARGO_PKG_VERSION"));

    // Load server configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  World: {}x{}", config.world.width, config.world.height);
    info!(
        "  Boundary: {} -> {} over {}ms",
        config.boundary.initial_radius, config.boundary.min_radius, config.boundary.shrink_duration_ms
    );
    info!("  Static files: {}", config.server.static_dir);

    // Shared game state plus its tick loop
    let game_state = server::start(&config);

    let static_files = ServeDir::new(&config.server.static_dir);
    let state = AppState {
        game_state,
        connections: ConnectionState::new(config.server.max_connections),
        static_files: static_files.clone(),
    };

    // The web client connects to the root path, so `/` serves both the
    // WebSocket endpoint and index.html.
    let app = Router::new()
        .route("/", get(root_handler))
        .fallback_service(static_files)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Upgrade game connections; plain HTTP requests get the static index.
async fn root_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => {
            return match state.static_files.clone().oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            };
        }
    };

    let Some(slot) = state.connections.try_add_connection() else {
        warn!("Connection rejected (limit reached): {}", addr);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    info!("WebSocket connection from {}", addr);
    // The slot lives in the callback, so a failed upgrade drops it too.
    ws.on_failed_upgrade(move |e| warn!("WebSocket upgrade from {} failed: {}", addr, e))
        .on_upgrade(move |socket| handle_websocket(socket, addr, state.game_state, slot))
}

/// Handle individual WebSocket connections
async fn handle_websocket(
    socket: WebSocket,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    slot: ConnectionSlot,
) {
    let result = handle_game_connection(socket, addr, game_state).await;
    drop(slot);

    if let Err(e) = result {
        error!("Connection error from {}: {}", addr, e);
    }
}

/// Adapt Axum WebSocket to work with server's session handler
async fn handle_game_connection(
    socket: WebSocket,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()> {
    let (write, read) = socket.split();

    let write = write.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text.into()))));
    let read = read.map(|msg| {
        msg.map(|msg| match msg {
            Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
            Message::Close(_) => Inbound::Close,
            _ => Inbound::Ignored,
        })
    });

    server::serve_session(write, read, addr, game_state).await
}
