//! Power-up and food pellet lifecycle.

use crate::collision::within_box;
use crate::config::PickupConfig;
use crate::entity::{PowerUp, Snake};
use glam::DVec2;
use protocol::{FoodPellet, PowerUpKind, PowerUpState};
use rand::Rng;
use std::collections::VecDeque;
use std::f64::consts::TAU;
use tracing::debug;

/// Hook invoked when a snake collects a power-up.
///
/// The registry only removes the power-up; whatever it does to the snake is up
/// to the effect.
pub trait PickupEffect: Send + Sync {
    fn apply(&mut self, snake: &mut Snake, kind: PowerUpKind);
}

/// Effect that leaves the snake unchanged.
#[derive(Debug, Default)]
pub struct NoEffect;

impl PickupEffect for NoEffect {
    fn apply(&mut self, snake: &mut Snake, kind: PowerUpKind) {
        debug!("Snake {} picked up {:?} (no effect)", snake.id, kind);
    }
}

/// Active power-ups and dropped pellets.
#[derive(Debug)]
pub struct PickupRegistry {
    next_power_up_id: u32,
    power_ups: Vec<PowerUp>,
    /// Oldest first.
    pellets: VecDeque<DVec2>,
    spawn_chance: f64,
    max_power_ups: usize,
    edge_offset: f64,
    max_pellets: usize,
}

impl PickupRegistry {
    pub fn new(config: &PickupConfig) -> Self {
        Self {
            next_power_up_id: 1,
            power_ups: Vec::new(),
            pellets: VecDeque::new(),
            spawn_chance: config.spawn_chance,
            max_power_ups: config.max_power_ups,
            edge_offset: config.edge_offset,
            max_pellets: config.max_pellets,
        }
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn pellet_count(&self) -> usize {
        self.pellets.len()
    }

    /// Roll for a power-up spawn near the boundary edge. Returns the new ID.
    pub fn maybe_spawn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        center: DVec2,
        radius: f64,
    ) -> Option<u32> {
        if self.power_ups.len() >= self.max_power_ups {
            return None;
        }
        if rng.random::<f64>() >= self.spawn_chance {
            return None;
        }

        let kind = PowerUpKind::ALL[rng.random_range(0..PowerUpKind::ALL.len())];
        let distance = (radius - self.edge_offset).max(0.0);
        let angle = rng.random::<f64>() * TAU;
        let position = center + DVec2::from_angle(angle) * distance;

        let id = self.spawn_at(kind, position);
        debug!("Spawned {:?} power-up {} at ({:.1}, {:.1})", kind, id, position.x, position.y);
        Some(id)
    }

    /// Place a power-up at an exact position.
    pub fn spawn_at(&mut self, kind: PowerUpKind, position: DVec2) -> u32 {
        let id = self.next_power_up_id;
        self.next_power_up_id += 1;
        self.power_ups.push(PowerUp::new(id, kind, position));
        id
    }

    /// Remove and return every power-up inside the proximity box of `head`.
    pub fn collect_at(&mut self, head: DVec2, size: f64) -> Vec<PowerUp> {
        let mut collected = Vec::new();
        self.power_ups.retain_mut(|p| {
            if p.active && within_box(head, p.position, size) {
                p.active = false;
                collected.push(p.clone());
                false
            } else {
                true
            }
        });
        collected
    }

    /// Drop one pellet at each of `points`.
    pub fn scatter<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = DVec2>,
    {
        self.pellets.extend(points);
    }

    /// Trim the pellet list to the configured cap, oldest first.
    pub fn enforce_pellet_cap(&mut self) -> usize {
        if self.max_pellets == 0 || self.pellets.len() <= self.max_pellets {
            return 0;
        }
        let excess = self.pellets.len() - self.max_pellets;
        self.pellets.drain(..excess);
        excess
    }

    pub fn power_up_states(&self) -> Vec<PowerUpState> {
        self.power_ups.iter().map(PowerUp::snapshot).collect()
    }

    pub fn pellet_states(&self) -> Vec<FoodPellet> {
        self.pellets.iter().map(|p| FoodPellet::new(p.x, p.y)).collect()
    }
}
