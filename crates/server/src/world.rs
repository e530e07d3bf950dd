//! World geometry.
//!
//! The playfield is a toroidal plane: anything leaving one edge re-enters on
//! the opposite one.

use crate::config::WorldConfig;
use glam::DVec2;
use rand::Rng;

/// Toroidal world bounds.
#[derive(Debug, Clone, Copy)]
pub struct World {
    pub width: f64,
    pub height: f64,
}

impl World {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Wrap a position into `[0, width) x [0, height)`.
    pub fn wrap(&self, position: DVec2) -> DVec2 {
        DVec2::new(wrap_axis(position.x, self.width), wrap_axis(position.y, self.height))
    }

    /// Uniformly random position anywhere in the world.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec2 {
        DVec2::new(
            rng.random::<f64>() * self.width,
            rng.random::<f64>() * self.height,
        )
    }
}

fn wrap_axis(value: f64, size: f64) -> f64 {
    let wrapped = value.rem_euclid(size);
    // rem_euclid can round up to exactly `size` for tiny negative inputs.
    if wrapped >= size { 0.0 } else { wrapped }
}
