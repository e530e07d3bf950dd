//! Game server implementation.

use crate::config::Config;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;

pub use game::{run_game_loop, GameState};

/// World state update broadcast (sent every tick).
#[derive(Debug, Clone)]
pub struct WorldUpdateBroadcast {
    /// Simulation tick that produced this update.
    pub tick: u64,
    /// Encoded `update` message, shared by every connection.
    pub payload: Arc<str>,
}

/// Transport-neutral inbound WebSocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Text(String),
    Close,
    /// Binary, ping and pong frames.
    Ignored,
}

/// Connection tracking state (shared across connection handlers).
#[derive(Debug)]
pub struct ConnectionState {
    /// Total number of connections.
    total_connections: AtomicUsize,
    max_connections: usize,
}

impl ConnectionState {
    pub fn new(max_connections: usize) -> Arc<Self> {
        Arc::new(Self {
            total_connections: AtomicUsize::new(0),
            max_connections,
        })
    }

    /// Try to add a connection. The slot is released when the returned guard drops.
    pub fn try_add_connection(self: &Arc<Self>) -> Option<ConnectionSlot> {
        self.total_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |total| {
                (total < self.max_connections).then_some(total + 1)
            })
            .ok()?;
        Some(ConnectionSlot {
            state: Arc::clone(self),
        })
    }

    pub fn total(&self) -> usize {
        self.total_connections.load(Ordering::Acquire)
    }
}

/// One admitted connection. Dropping it frees the slot, even when the
/// handshake never completes.
#[derive(Debug)]
pub struct ConnectionSlot {
    state: Arc<ConnectionState>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.total_connections.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Create the shared game state and start its tick loop.
pub fn start(config: &Config) -> Arc<RwLock<GameState>> {
    let (world_tx, _world_rx) = broadcast::channel::<WorldUpdateBroadcast>(5);
    let game_state = Arc::new(RwLock::new(GameState::new(config, world_tx)));

    let game_loop_state = Arc::clone(&game_state);
    let tick_interval = config.server.tick_interval_ms;
    tokio::spawn(async move {
        run_game_loop(game_loop_state, tick_interval).await;
    });

    game_state
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = ConnectionState::new(config.server.max_connections);
    let game_state = start(&config);

    loop {
        let (stream, addr) = listener.accept().await?;

        let Some(slot) = conn_state.try_add_connection() else {
            warn!("Connection rejected (limit reached): {}", addr);
            continue;
        };

        let game_state = Arc::clone(&game_state);

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game_state).await;
            drop(slot);

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();
    let write = write.with(|text: String| {
        future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(Message::Text(text.into())))
    });
    let read = read.map(|msg| {
        msg.map(|msg| match msg {
            Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
            Message::Close(_) => Inbound::Close,
            _ => Inbound::Ignored,
        })
    });

    serve_session(write, read, addr, game_state).await
}

/// Drive one player session over any text-frame transport: send `init`,
/// relay inbound messages to the game, forward every world update, and remove
/// the player when the connection ends.
pub async fn serve_session<W, R, E>(
    mut write: W,
    mut read: R,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
) -> anyhow::Result<()>
where
    W: Sink<String> + Unpin,
    W::Error: std::error::Error + Send + Sync + 'static,
    R: Stream<Item = Result<Inbound, E>> + Unpin,
    E: std::fmt::Display,
{
    // Subscribe before joining so no update between `init` and the loop is missed.
    let (mut world_rx, client_id, init) = {
        let mut state = game_state.write().await;
        let world_rx = state.subscribe();
        let (client_id, init) = state.add_client(addr)?;
        (world_rx, client_id, init)
    };

    let result = async {
        write.send(init).await?;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Inbound::Text(text))) => {
                            let mut state = game_state.write().await;
                            if let Err(e) = state.handle_message(client_id, &text) {
                                warn!("Message error from {}: {}", addr, e);
                            }
                        }
                        Some(Ok(Inbound::Close)) => {
                            info!("Client {} disconnected", addr);
                            break;
                        }
                        Some(Ok(Inbound::Ignored)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error from {}: {}", addr, e);
                            break;
                        }
                        None => {
                            break;
                        }
                    }
                }
                update = world_rx.recv() => {
                    match update {
                        Ok(update) => {
                            if let Err(e) = write.send(update.payload.to_string()).await {
                                warn!("Failed to send world update to {}: {}", addr, e);
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Client {} lagged behind by {} updates", client_id, skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    // Remove client
    game_state.write().await.remove_client(client_id);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Simulation;
    use futures_channel::mpsc;
    use serde_json::Value;

    #[test]
    fn test_connection_limit() {
        let state = ConnectionState::new(2);
        let first = state.try_add_connection().unwrap();
        let second = state.try_add_connection().unwrap();
        assert!(state.try_add_connection().is_none());
        assert_eq!(state.total(), 2);

        drop(first);
        let third = state.try_add_connection().unwrap();
        drop(second);
        drop(third);
        assert_eq!(state.total(), 0);
    }

    #[test]
    fn test_slot_released_when_handshake_callback_is_dropped() {
        let state = ConnectionState::new(1);
        let slot = state.try_add_connection().unwrap();
        // Stands in for an upgrade callback that never runs.
        let on_upgrade = move || drop(slot);
        assert!(state.try_add_connection().is_none());

        drop(on_upgrade);
        assert_eq!(state.total(), 0);
        assert!(state.try_add_connection().is_some());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let mut config = Config::default();
        config.pickups.spawn_chance = 0.0;
        let (world_tx, _) = broadcast::channel(5);
        let game = GameState::with_simulation(&config, Simulation::with_seed(&config, 3), world_tx.clone());
        let game_state = Arc::new(RwLock::new(game));

        let (out_tx, mut out_rx) = mpsc::unbounded::<String>();
        let (in_tx, in_rx) = mpsc::unbounded::<Result<Inbound, std::io::Error>>();
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        let session = tokio::spawn(serve_session(out_tx, in_rx, addr, Arc::clone(&game_state)));

        let init: Value = serde_json::from_str(&out_rx.next().await.unwrap()).unwrap();
        assert_eq!(init["type"], "init");
        let id = init["playerId"].as_u64().unwrap() as u32;

        in_tx
            .unbounded_send(Ok(Inbound::Text(format!(
                r#"{{"type":"move","playerId":{id},"angle":2.0}}"#
            ))))
            .unwrap();
        in_tx.unbounded_send(Ok(Inbound::Text("garbage".into()))).unwrap();

        while game_state.read().await.simulation.entity(id).unwrap().angle() != 2.0 {
            tokio::task::yield_now().await;
        }

        let update = game_state.write().await.tick(16.0).unwrap();
        world_tx.send(update).unwrap();
        let update: Value = serde_json::from_str(&out_rx.next().await.unwrap()).unwrap();
        assert_eq!(update["type"], "update");
        assert_eq!(update["data"]["players"][0]["angle"], 2.0);

        in_tx.unbounded_send(Ok(Inbound::Close)).unwrap();
        session.await.unwrap().unwrap();

        let game = game_state.read().await;
        assert!(game.clients.is_empty());
        assert_eq!(game.simulation.entity_count(), 0);
    }
}
