//! Server -> Client messages and the world snapshot payload.

use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 2D point on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Public view of one snake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    /// Head first.
    pub segments: Vec<Point>,
    pub angle: f64,
    pub alive: bool,
    /// `#RRGGBB`.
    pub color: String,
}

/// Power-up kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    SpeedBoost,
    Invincible,
    Cutter,
    Magnet,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::Invincible,
        PowerUpKind::Cutter,
        PowerUpKind::Magnet,
    ];
}

/// Public view of an active power-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpState {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    pub x: f64,
    pub y: f64,
}

/// Pellet type tag. Only one kind exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PelletKind {
    #[default]
    Score,
}

/// A food pellet left behind by a dead snake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoodPellet {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: PelletKind,
}

impl FoodPellet {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            kind: PelletKind::Score,
        }
    }
}

/// Sound hint for the tick that produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sound {
    Collision,
    Eat,
}

/// Complete world state at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: Vec<PlayerState>,
    pub food: Point,
    pub scores: BTreeMap<u32, i64>,
    pub boundary_radius: f64,
    pub food_pellets: Vec<FoodPellet>,
    pub power_ups: Vec<PowerUpState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<Sound>,
}

/// Server message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once after connect.
    #[serde(rename_all = "camelCase")]
    Init { player_id: u32, data: GameSnapshot },
    /// Sent every tick.
    Update { data: GameSnapshot },
}

impl ServerMessage {
    /// Encode to a JSON text frame.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
