//! Collectible power-up.

use glam::DVec2;
use protocol::{PowerUpKind, PowerUpState};

/// A power-up lying in the arena.
#[derive(Debug, Clone)]
pub struct PowerUp {
    /// Unique power-up ID.
    pub id: u32,
    pub kind: PowerUpKind,
    pub position: DVec2,
    /// Cleared once collected.
    pub active: bool,
}

impl PowerUp {
    pub fn new(id: u32, kind: PowerUpKind, position: DVec2) -> Self {
        Self {
            id,
            kind,
            position,
            active: true,
        }
    }

    pub fn snapshot(&self) -> PowerUpState {
        PowerUpState {
            id: self.id,
            kind: self.kind,
            x: self.position.x,
            y: self.position.y,
        }
    }
}
