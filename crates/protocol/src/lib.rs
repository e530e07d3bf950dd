//! Shared protocol crate for snake warzone.
//!
//! This crate contains:
//! - Message definitions for both directions (JSON over WebSocket text frames)
//! - The world snapshot payload clients render from
//! - Shared types (Color, Point)

mod error;
pub mod packets;

pub use error::ProtocolError;
pub use packets::{
    ClientMessage, FoodPellet, GameSnapshot, PelletKind, PlayerState, Point, PowerUpKind,
    PowerUpState, ServerMessage, Sound,
};

/// RGB color used for snakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Color = Color::new(0xFF, 0xFF, 0xFF);

    /// CSS-style `#RRGGBB` representation used on the wire.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::WHITE.to_hex(), "#FFFFFF");
        assert_eq!(Color::new(1, 0x2a, 0xb0).to_hex(), "#012AB0");
    }
}
