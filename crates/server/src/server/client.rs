//! Client session state.

use std::net::SocketAddr;
use std::time::Instant;

/// A connected client session. The client ID doubles as the ID of the snake it controls.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID (same as its snake's entity ID).
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
    /// When the connection was accepted.
    pub connected_at: Instant,
    /// Last inbound message.
    pub last_activity: Instant,
    /// Inbound messages handled so far.
    pub messages: u64,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_activity: now,
            messages: 0,
        }
    }

    /// Update activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.messages += 1;
    }
}
