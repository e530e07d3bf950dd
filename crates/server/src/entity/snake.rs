//! Player-controlled snake.

use crate::world::World;
use glam::DVec2;
use protocol::{Color, PlayerState, Point};
use std::collections::VecDeque;

/// A snake: a head that moves along its heading, trailed by a fixed-length
/// history of head positions.
#[derive(Debug, Clone)]
pub struct Snake {
    /// Unique entity ID.
    pub id: u32,
    /// Head position.
    position: DVec2,
    /// Heading in radians.
    angle: f64,
    /// Units per second.
    pub speed: f64,
    /// Head first. Never empty.
    segments: VecDeque<DVec2>,
    max_segments: usize,
    alive: bool,
    pub color: Color,
}

impl Snake {
    /// Create a snake with a single segment at `position`, heading 0.
    pub fn new(id: u32, position: DVec2, speed: f64, max_segments: usize, color: Color) -> Self {
        let mut segments = VecDeque::with_capacity(max_segments + 1);
        segments.push_back(position);
        Self {
            id,
            position,
            angle: 0.0,
            speed,
            segments,
            max_segments: max_segments.max(1),
            alive: true,
            color,
        }
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Segment positions, head first.
    pub fn segments(&self) -> &VecDeque<DVec2> {
        &self.segments
    }

    /// Move the head for `dt_ms` milliseconds and shift the body behind it.
    pub fn advance(&mut self, dt_ms: f64, world: &World) {
        if !self.alive {
            return;
        }

        let velocity = DVec2::from_angle(self.angle) * self.speed;
        self.position = world.wrap(self.position + velocity * (dt_ms / 1000.0));

        self.segments.push_front(self.position);
        while self.segments.len() > self.max_segments {
            self.segments.pop_back();
        }
    }

    /// Replace the heading.
    pub fn set_heading(&mut self, angle: f64) {
        self.angle = angle;
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// Owned public view for the wire.
    pub fn snapshot(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            x: self.position.x,
            y: self.position.y,
            segments: self.segments.iter().map(|s| Point::new(s.x, s.y)).collect(),
            angle: self.angle,
            alive: self.alive,
            color: self.color.to_hex(),
        }
    }
}
