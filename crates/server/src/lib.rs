//! Snake warzone game server library.

pub mod boundary;
pub mod collision;
pub mod config;
pub mod entity;
pub mod pickups;
pub mod server;
pub mod simulation;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use server::{
    run, serve_session, start, ConnectionSlot, ConnectionState, GameState, Inbound, WorldUpdateBroadcast,
};
pub use simulation::Simulation;
