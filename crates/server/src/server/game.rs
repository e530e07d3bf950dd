//! Game state and main loop.

use crate::config::Config;
use crate::simulation::Simulation;
use futures_util::FutureExt;
use protocol::{ClientMessage, ProtocolError, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::client::Client;
use super::WorldUpdateBroadcast;

/// Session layer around the simulation: connected clients, inbound message
/// dispatch and the per-tick update broadcast.
pub struct GameState {
    pub config: Config,

    // Authoritative world
    pub simulation: Simulation,

    // Connected clients, keyed by the ID of the snake they control
    pub clients: HashMap<u32, Client>,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,

    // World update broadcast channel
    world_tx: broadcast::Sender<WorldUpdateBroadcast>,
}

impl GameState {
    /// Create a new game state.
    pub fn new(config: &Config, world_tx: broadcast::Sender<WorldUpdateBroadcast>) -> Self {
        Self::with_simulation(config, Simulation::new(config), world_tx)
    }

    /// Create a game state around an existing simulation.
    pub fn with_simulation(
        config: &Config,
        simulation: Simulation,
        world_tx: broadcast::Sender<WorldUpdateBroadcast>,
    ) -> Self {
        Self {
            config: config.clone(),
            simulation,
            clients: HashMap::new(),
            update_time_avg: 0.0,
            world_tx,
        }
    }

    /// Subscribe to per-tick world updates.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldUpdateBroadcast> {
        self.world_tx.subscribe()
    }

    pub fn world_sender(&self) -> broadcast::Sender<WorldUpdateBroadcast> {
        self.world_tx.clone()
    }

    /// Add a new client and spawn its snake. Returns the client ID and the
    /// encoded `init` message.
    pub fn add_client(&mut self, addr: SocketAddr) -> Result<(u32, String), ProtocolError> {
        let id = self.simulation.add_entity();
        let init = ServerMessage::Init {
            player_id: id,
            data: self.simulation.snapshot(),
        };
        let json = match init.to_json() {
            Ok(json) => json,
            Err(e) => {
                self.simulation.remove_entity(id);
                return Err(e);
            }
        };

        self.clients.insert(id, Client::new(id, addr));
        info!("Client {} connected from {}", id, addr);
        Ok((id, json))
    }

    /// Remove a client and its snake. Removing twice is a no-op.
    pub fn remove_client(&mut self, id: u32) {
        let removed = self.simulation.remove_entity(id);
        if let Some(client) = self.clients.remove(&id) {
            info!(
                "Client {} ({}) disconnected after {:.1}s",
                id,
                client.addr,
                client.connected_at.elapsed().as_secs_f64()
            );
        } else if removed {
            debug!("Removed orphan snake {}", id);
        }
    }

    /// Handle a text message from a client.
    pub fn handle_message(&mut self, client_id: u32, text: &str) -> Result<(), ProtocolError> {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.touch();
        }

        match ClientMessage::parse(text)? {
            ClientMessage::Move { player_id, angle } => {
                if player_id != client_id {
                    debug!(
                        "Client {} tried to steer snake {}; ignoring",
                        client_id, player_id
                    );
                } else if !self.simulation.set_heading(player_id, angle) {
                    debug!("Ignoring move for snake {} (angle {})", player_id, angle);
                }
            }
            ClientMessage::Unknown => {
                debug!("Client {} sent unknown message kind: {}", client_id, text);
            }
        }

        Ok(())
    }

    /// Run a single game tick and return the update to broadcast.
    pub fn tick(&mut self, dt_ms: f64) -> Option<WorldUpdateBroadcast> {
        let events = self.simulation.tick(dt_ms);
        for death in &events.deaths {
            debug!("Snake {} died: {:?}", death.snake_id, death.cause);
        }
        if events.pellets_trimmed > 0 {
            debug!("Dropped {} old pellets", events.pellets_trimmed);
        }

        let tick = self.simulation.tick_count();
        let message = ServerMessage::Update {
            data: self.simulation.snapshot(),
        };
        match message.to_json() {
            Ok(json) => Some(WorldUpdateBroadcast {
                tick,
                payload: json.into(),
            }),
            Err(e) => {
                error!("Failed to encode update for tick {}: {}", tick, e);
                None
            }
        }
    }
}

/// Run the main game loop.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_interval_ms: u64) {
    let tick_interval_ms = tick_interval_ms.max(1);
    let period = Duration::from_millis(tick_interval_ms);
    let mut ticker = interval_at(Instant::now() + period, period);
    // Ticks never overlap; a slow tick delays the next one instead of bunching up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let (hibernate, world_tx) = {
        let game = state.read().await;
        (game.config.server.hibernate, game.world_sender())
    };
    info!("Game loop running every {}ms", tick_interval_ms);

    let mut last_tick: Option<Instant> = None;

    loop {
        let scheduled = ticker.tick().await;

        // Hibernate when no users are connected; the arena clock stands still.
        if hibernate {
            let game = state.read().await;
            if game.clients.is_empty() {
                drop(game);
                last_tick = None;
                sleep(Duration::from_millis((tick_interval_ms * 4).max(100))).await;
                continue;
            }
        }

        // Drain any backlog of tick events so we always process the most recent tick.
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(
                "Skipped {} ticks to stay current (lag: {:?})",
                skipped,
                Instant::now().saturating_duration_since(scheduled)
            );
        }

        let now = Instant::now();
        let dt_ms = match last_tick {
            Some(previous) => now.duration_since(previous).as_secs_f64() * 1000.0,
            None => tick_interval_ms as f64,
        };
        last_tick = Some(now);

        // Run tick and extract the pending broadcast
        let update = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let update = game.tick(dt_ms);
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = tick_interval_ms as f64 * 0.9;
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} clients, {} snakes",
                    game.simulation.tick_count(),
                    tick_ms,
                    tick_budget,
                    game.clients.len(),
                    game.simulation.entity_count()
                );
            }

            if game.simulation.tick_count() % 600 == 0 {
                debug!(
                    "Tick #{}: avg {:.2}ms | {} clients, {} alive, radius {:.1}, {} power-ups, {} pellets",
                    game.simulation.tick_count(),
                    game.update_time_avg,
                    game.clients.len(),
                    game.simulation.living_count(),
                    game.simulation.radius(),
                    game.simulation.pickups().power_ups().len(),
                    game.simulation.pickups().pellet_count()
                );
            }

            update
        }; // Write lock released here

        if let Some(update) = update {
            // No receivers is fine: everyone may have just left.
            let _ = world_tx.send(update);
        }
    }
}
