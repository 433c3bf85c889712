//! Websocket transport: one command loop that owns the game, and one handler task per socket.

pub mod handler;
pub mod server;

/// Identifies one open websocket. Never reused while the process runs.
pub type ConnId = u64;

/// A text frame on its way to a socket.
pub type Msg = String;
