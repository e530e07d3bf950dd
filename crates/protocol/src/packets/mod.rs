//! Message definitions for the snake warzone protocol.
//!
//! Every message is a JSON object with a `type` discriminator. This module
//! contains both client->server and server->client messages, plus the snapshot
//! payload carried by `init` and `update`.

mod client;
mod server;

pub use client::*;
pub use server::*;
