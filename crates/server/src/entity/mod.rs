//! Game entities.
//!
//! Snakes are owned by players; power-ups are spawned by the pickup registry.

mod power_up;
mod snake;

pub use power_up::PowerUp;
pub use snake::Snake;
