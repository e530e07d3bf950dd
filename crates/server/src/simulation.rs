//! Authoritative simulation.
//!
//! `Simulation` owns every snake, the pickup registry, the score table and the
//! simulation clock. `tick` is the only way to advance the world and
//! `snapshot` the only way to read it out.

use crate::boundary::Boundary;
use crate::collision::first_hit;
use crate::config::{Config, SnakeConfig};
use crate::entity::Snake;
use crate::pickups::{NoEffect, PickupEffect, PickupRegistry};
use crate::world::World;
use glam::DVec2;
use protocol::{Color, GameSnapshot, Point, PowerUpKind, Sound};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::debug;

/// Why a snake died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Head ran into its own body.
    SelfCollision,
    /// Head ran into the body of the snake with this ID.
    Snake(u32),
    /// Head left the arena.
    Boundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
    pub snake_id: u32,
    pub cause: DeathCause,
    /// Pellets dropped (one per segment).
    pub pellets: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pickup {
    pub snake_id: u32,
    pub power_up_id: u32,
    pub kind: PowerUpKind,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    pub spawned_power_ups: Vec<u32>,
    pub deaths: Vec<Death>,
    pub pickups: Vec<Pickup>,
    /// Pellets dropped by the cap.
    pub pellets_trimmed: usize,
}

impl TickEvents {
    fn sound(&self) -> Option<Sound> {
        if !self.deaths.is_empty() {
            Some(Sound::Collision)
        } else if !self.pickups.is_empty() {
            Some(Sound::Eat)
        } else {
            None
        }
    }
}

/// The game world and its rules.
pub struct Simulation {
    world: World,
    boundary: Boundary,
    snake_config: SnakeConfig,
    next_entity_id: u32,
    /// Join order.
    snakes: Vec<Snake>,
    scores: BTreeMap<u32, i64>,
    pickups: PickupRegistry,
    effect: Box<dyn PickupEffect>,
    rng: StdRng,
    elapsed_ms: f64,
    tick_count: u64,
    last_events: TickEvents,
}

impl Simulation {
    /// Create a simulation seeded from the OS.
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a deterministic simulation.
    pub fn with_seed(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, rng: StdRng) -> Self {
        let world = World::from_config(&config.world);
        Self {
            boundary: Boundary::new(world.center(), &config.boundary),
            world,
            snake_config: config.snake.clone(),
            next_entity_id: 1,
            snakes: Vec::new(),
            scores: BTreeMap::new(),
            pickups: PickupRegistry::new(&config.pickups),
            effect: Box::new(NoEffect),
            rng,
            elapsed_ms: 0.0,
            tick_count: 0,
            last_events: TickEvents::default(),
        }
    }

    /// Replace the hook run when a power-up is collected.
    pub fn set_pickup_effect(&mut self, effect: Box<dyn PickupEffect>) {
        self.effect = effect;
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Current boundary radius.
    pub fn radius(&self) -> f64 {
        self.boundary.radius(self.elapsed_ms)
    }

    pub fn entity(&self, id: u32) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id == id)
    }

    pub fn entity_count(&self) -> usize {
        self.snakes.len()
    }

    pub fn living_count(&self) -> usize {
        self.snakes.iter().filter(|s| s.is_alive()).count()
    }

    pub fn pickups(&self) -> &PickupRegistry {
        &self.pickups
    }

    pub fn pickups_mut(&mut self) -> &mut PickupRegistry {
        &mut self.pickups
    }

    /// Events of the most recent tick.
    pub fn last_events(&self) -> &TickEvents {
        &self.last_events
    }

    /// Add a snake at a random position. Returns its fresh ID.
    pub fn add_entity(&mut self) -> u32 {
        let position = self.world.random_position(&mut self.rng);
        self.add_entity_at(position)
    }

    /// Add a snake at `position` (wrapped into the world).
    pub fn add_entity_at(&mut self, position: DVec2) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let color = Color::new(
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
            self.rng.random_range(50..=255),
        );
        let snake = Snake::new(
            id,
            self.world.wrap(position),
            self.snake_config.speed,
            self.snake_config.max_segments,
            color,
        );
        debug!("Snake {} spawned at ({:.1}, {:.1})", id, snake.position().x, snake.position().y);

        self.snakes.push(snake);
        self.scores.insert(id, 0);
        id
    }

    /// Remove a snake and its score. Unknown IDs are ignored.
    pub fn remove_entity(&mut self, id: u32) -> bool {
        self.scores.remove(&id);
        let before = self.snakes.len();
        self.snakes.retain(|s| s.id != id);
        before != self.snakes.len()
    }

    /// Set the heading of snake `id`. Returns false for unknown IDs or a non-finite angle.
    pub fn set_heading(&mut self, id: u32, angle: f64) -> bool {
        if !angle.is_finite() {
            return false;
        }
        match self.snakes.iter_mut().find(|s| s.id == id) {
            Some(snake) => {
                snake.set_heading(angle);
                true
            }
            None => false,
        }
    }

    /// Advance the world by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f64) -> &TickEvents {
        let dt = if dt_ms.is_finite() { dt_ms.max(0.0) } else { 0.0 };
        self.elapsed_ms += dt;
        self.tick_count += 1;

        let radius = self.boundary.radius(self.elapsed_ms);
        let mut events = TickEvents::default();

        if let Some(id) = self
            .pickups
            .maybe_spawn(&mut self.rng, self.boundary.center(), radius)
        {
            events.spawned_power_ups.push(id);
        }

        let size = self.snake_config.segment_size;
        for i in 0..self.snakes.len() {
            if !self.snakes[i].is_alive() {
                continue;
            }

            self.snakes[i].advance(dt, &self.world);

            if let Some(cause) = self.fatal_collision(i, radius) {
                let snake = &mut self.snakes[i];
                snake.kill();
                let pellets = snake.segments().len();
                self.pickups.scatter(snake.segments().iter().copied());
                debug!("Snake {} died ({:?}), dropped {} pellets", snake.id, cause, pellets);
                events.deaths.push(Death {
                    snake_id: snake.id,
                    cause,
                    pellets,
                });
                continue;
            }

            let head = self.snakes[i].position();
            for power_up in self.pickups.collect_at(head, size) {
                let snake = &mut self.snakes[i];
                debug!("Snake {} collected {:?} power-up {}", snake.id, power_up.kind, power_up.id);
                self.effect.apply(snake, power_up.kind);
                events.pickups.push(Pickup {
                    snake_id: snake.id,
                    power_up_id: power_up.id,
                    kind: power_up.kind,
                });
            }
        }

        events.pellets_trimmed = self.pickups.enforce_pellet_cap();
        self.last_events = events;
        &self.last_events
    }

    /// First fatal collision for the snake at `index`: self, then other snakes
    /// in join order, then the boundary.
    fn fatal_collision(&self, index: usize, radius: f64) -> Option<DeathCause> {
        let snake = &self.snakes[index];
        let head = snake.position();
        let size = self.snake_config.segment_size;

        // Segment 0 is the head itself.
        let own_body = snake.segments().iter().skip(1 + self.snake_config.head_grace_segments);
        if first_hit(head, own_body, size).is_some() {
            return Some(DeathCause::SelfCollision);
        }

        for other in &self.snakes {
            if other.id == snake.id || !other.is_alive() {
                continue;
            }
            if first_hit(head, other.segments(), size).is_some() {
                return Some(DeathCause::Snake(other.id));
            }
        }

        if !self.boundary.contains(head, radius) {
            return Some(DeathCause::Boundary);
        }

        None
    }

    /// Read-only projection of the current state.
    pub fn snapshot(&self) -> GameSnapshot {
        let center = self.world.center();
        GameSnapshot {
            players: self.snakes.iter().map(Snake::snapshot).collect(),
            food: Point::new(center.x, center.y),
            scores: self.scores.clone(),
            boundary_radius: self.radius(),
            food_pellets: self.pickups.pellet_states(),
            power_ups: self.pickups.power_up_states(),
            sound: self.last_events.sound(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.pickups.spawn_chance = 0.0;
        config
    }

    fn sim() -> Simulation {
        Simulation::with_seed(&quiet_config(), 42)
    }

    fn center() -> DVec2 {
        DVec2::new(2000.0, 2000.0)
    }

    #[test]
    fn test_ids_are_fresh() {
        let mut sim = sim();
        let a = sim.add_entity();
        let b = sim.add_entity();
        sim.remove_entity(a);
        let c = sim.add_entity();
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(sim.snapshot().scores.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        assert!(!sim.remove_entity(99));
        assert!(sim.remove_entity(a));
        assert!(!sim.remove_entity(a));
        assert_eq!(sim.entity_count(), 0);
        assert!(sim.snapshot().scores.is_empty());
        sim.tick(16.0);
    }

    #[test]
    fn test_set_heading() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        assert!(sim.set_heading(a, 1.0));
        assert_eq!(sim.entity(a).unwrap().angle(), 1.0);
        assert!(!sim.set_heading(a, f64::NAN));
        assert_eq!(sim.entity(a).unwrap().angle(), 1.0);
        assert!(!sim.set_heading(77, 0.5));
    }

    #[test]
    fn test_self_collision_kills_and_drops_pellets() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        sim.snakes[0].speed = 0.0;

        let events = sim.tick(16.0).clone();
        let snake = sim.entity(a).unwrap();
        assert!(!snake.is_alive());
        assert_eq!(
            events.deaths,
            vec![Death {
                snake_id: a,
                cause: DeathCause::SelfCollision,
                pellets: 2
            }]
        );
        assert_eq!(sim.pickups().pellet_count(), snake.segments().len());
        assert_eq!(sim.snapshot().sound, Some(Sound::Collision));
    }

    #[test]
    fn test_head_grace_segments_skip_self_check() {
        let mut config = quiet_config();
        config.snake.head_grace_segments = 1;
        let mut sim = Simulation::with_seed(&config, 1);
        let a = sim.add_entity_at(center());
        sim.snakes[0].speed = 0.0;

        sim.tick(16.0);
        assert!(sim.entity(a).unwrap().is_alive());
        // Third segment now overlaps too.
        sim.tick(16.0);
        assert!(!sim.entity(a).unwrap().is_alive());
    }

    #[test]
    fn test_moving_snake_survives_when_segments_are_spread() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        // 100 units/s * 200 ms = 20 units between segments.
        for _ in 0..5 {
            sim.tick(200.0);
        }
        assert!(sim.entity(a).unwrap().is_alive());
        assert_eq!(sim.pickups().pellet_count(), 0);
    }

    #[test]
    fn test_head_into_other_body_kills_only_attacker() {
        let mut sim = sim();
        let a = sim.add_entity_at(DVec2::new(1980.0, 2000.0));
        let b = sim.add_entity_at(center());
        sim.set_heading(b, std::f64::consts::FRAC_PI_2);

        // A moves 15 units, ending 5 units short of B's only segment.
        let events = sim.tick(150.0).clone();

        let snake_a = sim.entity(a).unwrap();
        assert!(!snake_a.is_alive());
        assert!(sim.entity(b).unwrap().is_alive());
        assert_eq!(sim.pickups().pellet_count(), snake_a.segments().len());
        assert_eq!(events.deaths.len(), 1);
        assert_eq!(events.deaths[0].cause, DeathCause::Snake(b));
    }

    #[test]
    fn test_first_overlapping_body_wins() {
        let mut sim = sim();
        let a = sim.add_entity_at(DVec2::new(1980.0, 2000.0));
        let b = sim.add_entity_at(center());
        let c = sim.add_entity_at(DVec2::new(1990.0, 2006.0));
        sim.set_heading(b, std::f64::consts::FRAC_PI_2);
        sim.set_heading(c, -std::f64::consts::FRAC_PI_2);

        // A's head lands at (1995, 2000), inside both B's and C's boxes.
        let events = sim.tick(150.0).clone();

        let snake_a = sim.entity(a).unwrap();
        assert!(!snake_a.is_alive());
        assert_eq!(
            events.deaths,
            vec![Death {
                snake_id: a,
                cause: DeathCause::Snake(b),
                pellets: snake_a.segments().len()
            }]
        );
        assert_eq!(sim.pickups().pellet_count(), snake_a.segments().len());
        assert!(sim.entity(b).unwrap().is_alive());
        assert!(sim.entity(c).unwrap().is_alive());
    }

    #[test]
    fn test_dead_bodies_are_not_obstacles() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        sim.snakes[0].speed = 0.0;
        sim.tick(16.0);
        assert!(!sim.entity(a).unwrap().is_alive());

        // B drives straight through A's corpse.
        let b = sim.add_entity_at(DVec2::new(1980.0, 2000.0));
        sim.tick(150.0);
        assert!(sim.entity(b).unwrap().is_alive());
    }

    #[test]
    fn test_boundary_death() {
        let mut sim = sim();
        let inside = sim.add_entity_at(DVec2::new(2500.0, 2000.0));
        let outside = sim.add_entity_at(DVec2::new(100.0, 100.0));

        sim.tick(200.0);
        assert!(sim.entity(inside).unwrap().is_alive());
        assert!(!sim.entity(outside).unwrap().is_alive());
        assert_eq!(sim.last_events().deaths[0].cause, DeathCause::Boundary);
        assert_eq!(sim.pickups().pellet_count(), 2);
    }

    #[test]
    fn test_shrinking_boundary_catches_up() {
        let mut sim = sim();
        // End of the linear phase: radius 200.
        sim.tick(180_000.0);
        assert!((sim.snapshot().boundary_radius - 200.0).abs() < 1e-9);

        let near = sim.add_entity_at(DVec2::new(2050.0, 2000.0));
        let far = sim.add_entity_at(DVec2::new(2000.0, 2500.0));
        sim.tick(200.0);
        assert!(sim.entity(near).unwrap().is_alive());
        assert!(!sim.entity(far).unwrap().is_alive());
    }

    #[test]
    fn test_pickup_consumed_once() {
        let mut sim = sim();
        let a = sim.add_entity_at(center());
        let id = sim
            .pickups_mut()
            .spawn_at(PowerUpKind::SpeedBoost, DVec2::new(2020.0, 2000.0));

        let events = sim.tick(200.0).clone();
        assert_eq!(
            events.pickups,
            vec![Pickup {
                snake_id: a,
                power_up_id: id,
                kind: PowerUpKind::SpeedBoost
            }]
        );
        let snapshot = sim.snapshot();
        assert!(snapshot.power_ups.is_empty());
        assert_eq!(snapshot.sound, Some(Sound::Eat));

        sim.tick(200.0);
        assert!(sim.last_events().pickups.is_empty());
        assert_eq!(sim.snapshot().sound, None);
    }

    #[test]
    fn test_dead_snake_collects_nothing() {
        let mut sim = sim();
        sim.add_entity_at(DVec2::new(100.0, 100.0));
        sim.pickups_mut()
            .spawn_at(PowerUpKind::Magnet, DVec2::new(120.0, 100.0));

        sim.tick(200.0);
        assert_eq!(sim.pickups().power_ups().len(), 1);
    }

    struct Recorder(Arc<Mutex<Vec<(u32, PowerUpKind)>>>);

    impl PickupEffect for Recorder {
        fn apply(&mut self, snake: &mut Snake, kind: PowerUpKind) {
            self.0.lock().unwrap().push((snake.id, kind));
        }
    }

    #[test]
    fn test_pickup_effect_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = sim();
        sim.set_pickup_effect(Box::new(Recorder(Arc::clone(&seen))));
        let a = sim.add_entity_at(center());
        sim.pickups_mut()
            .spawn_at(PowerUpKind::Cutter, DVec2::new(2020.0, 2000.0));

        sim.tick(200.0);
        assert_eq!(*seen.lock().unwrap(), vec![(a, PowerUpKind::Cutter)]);
    }

    #[test]
    fn test_power_ups_spawn_up_to_cap() {
        let mut config = Config::default();
        config.pickups.spawn_chance = 1.0;
        let mut sim = Simulation::with_seed(&config, 9);
        for _ in 0..20 {
            sim.tick(16.0);
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.power_ups.len(), 5);
        let r = snapshot.boundary_radius - 200.0;
        for p in &snapshot.power_ups {
            let d = DVec2::new(p.x, p.y).distance(center());
            assert!(d <= snapshot.boundary_radius);
            assert!(d >= r - 20.0);
        }
    }

    #[test]
    fn test_snapshot_is_pure() {
        let mut sim = sim();
        sim.add_entity();
        sim.add_entity();
        sim.tick(16.0);
        assert_eq!(sim.snapshot(), sim.snapshot());

        let mut taken = sim.snapshot();
        taken.players.clear();
        taken.scores.clear();
        assert_eq!(sim.snapshot().players.len(), 2);
        assert_eq!(sim.snapshot().scores.len(), 2);
    }

    #[test]
    fn test_bad_dt_does_not_move_clock() {
        let mut sim = sim();
        sim.tick(f64::NAN);
        sim.tick(-50.0);
        assert_eq!(sim.elapsed_ms(), 0.0);
        assert_eq!(sim.tick_count(), 2);
        assert_eq!(sim.radius(), 2000.0);
    }

    #[test]
    fn test_random_spawn_in_world() {
        let mut sim = sim();
        let a = sim.add_entity();
        let p = sim.entity(a).unwrap().snapshot();
        assert!((0.0..4000.0).contains(&p.x));
        assert!((0.0..4000.0).contains(&p.y));
        assert_eq!(p.angle, 0.0);
        assert!(p.alive);
        assert_eq!(p.color.len(), 7);
        assert_eq!(p.segments.len(), 1);
    }
}
