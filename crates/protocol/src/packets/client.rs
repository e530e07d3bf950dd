//! Client -> Server message parsing.

use crate::ProtocolError;
use serde::Deserialize;

/// Parsed client message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Continuous heading update for the sender's snake.
    #[serde(rename_all = "camelCase")]
    Move { player_id: u32, angle: f64 },
    /// Any message kind this server does not know about.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse a client message from a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }
}
