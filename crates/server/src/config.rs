//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub boundary: BoundaryConfig,
    #[serde(default)]
    pub snake: SnakeConfig,
    #[serde(default)]
    pub pickups: PickupConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Server networking and scheduling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum simultaneous connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Tick interval in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Pause the simulation while nobody is connected.
    #[serde(default = "default_hibernate")]
    pub hibernate: bool,
    /// Directory of the built web client (served by the `warzone` binary).
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            tick_interval_ms: default_tick_interval(),
            hibernate: default_hibernate(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_tick_interval() -> u64 {
    16
}
fn default_hibernate() -> bool {
    true
}
fn default_static_dir() -> String {
    "dist".to_string()
}

/// Toroidal world dimensions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f64,
    #[serde(default = "default_world_size")]
    pub height: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
        }
    }
}

fn default_world_size() -> f64 {
    4000.0
}

/// Shrinking arena schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryConfig {
    #[serde(default = "default_initial_radius")]
    pub initial_radius: f64,
    /// Radius reached at the end of the linear phase.
    #[serde(default = "default_min_radius")]
    pub min_radius: f64,
    #[serde(default = "default_shrink_duration")]
    pub shrink_duration_ms: f64,
    /// After the linear phase the radius halves once per interval.
    #[serde(default = "default_halving_interval")]
    pub halving_interval_ms: f64,
    #[serde(default = "default_floor_radius")]
    pub floor_radius: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            initial_radius: default_initial_radius(),
            min_radius: default_min_radius(),
            shrink_duration_ms: default_shrink_duration(),
            halving_interval_ms: default_halving_interval(),
            floor_radius: default_floor_radius(),
        }
    }
}

fn default_initial_radius() -> f64 {
    2000.0
}
fn default_min_radius() -> f64 {
    200.0
}
fn default_shrink_duration() -> f64 {
    180_000.0
}
fn default_halving_interval() -> f64 {
    30_000.0
}
fn default_floor_radius() -> f64 {
    1.0
}

/// Snake movement and collision settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnakeConfig {
    /// Units per second.
    #[serde(default = "default_snake_speed")]
    pub speed: f64,
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
    /// Side of the axis-aligned proximity box.
    #[serde(default = "default_segment_size")]
    pub segment_size: f64,
    /// Segments right behind the head that are skipped by the self-collision check.
    #[serde(default)]
    pub head_grace_segments: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            speed: default_snake_speed(),
            max_segments: default_max_segments(),
            segment_size: default_segment_size(),
            head_grace_segments: 0,
        }
    }
}

fn default_snake_speed() -> f64 {
    100.0
}
fn default_max_segments() -> usize {
    10
}
fn default_segment_size() -> f64 {
    10.0
}

/// Power-up spawning and pellet retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PickupConfig {
    /// Probability of a spawn attempt succeeding on each tick.
    #[serde(default = "default_spawn_chance")]
    pub spawn_chance: f64,
    #[serde(default = "default_max_power_ups")]
    pub max_power_ups: usize,
    /// Power-ups spawn this far inside the current boundary radius.
    #[serde(default = "default_edge_offset")]
    pub edge_offset: f64,
    /// Oldest pellets are dropped past this count (0 = keep all).
    #[serde(default = "default_max_pellets")]
    pub max_pellets: usize,
}

impl Default for PickupConfig {
    fn default() -> Self {
        Self {
            spawn_chance: default_spawn_chance(),
            max_power_ups: default_max_power_ups(),
            edge_offset: default_edge_offset(),
            max_pellets: default_max_pellets(),
        }
    }
}

fn default_spawn_chance() -> f64 {
    0.01
}
fn default_max_power_ups() -> usize {
    5
}
fn default_edge_offset() -> f64 {
    200.0
}
fn default_max_pellets() -> usize {
    2000
}
