//! Proxy Module
//!
//! The connection-facing half of the proxy: the accept loop, the
//! per-connection handler, and the origin relay.

pub mod handler;
pub mod listener;
pub mod origin;

pub use handler::handle_connection;
pub use listener::serve;

// == Public Constants ==
/// Relay chunk and line buffer size in bytes
pub const IO_CHUNK_SIZE: usize = 8192;
