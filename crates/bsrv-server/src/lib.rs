//! The WebSocket-facing half of the command server: per-connection state
//! (C9) and the listener/accept loop/expiry sweep (C10).

pub mod connection;
pub mod server;
pub mod state;

pub use server::{ServerConfig, run};
pub use state::ServerState;
