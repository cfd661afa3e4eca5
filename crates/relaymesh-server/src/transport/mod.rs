//! Transport layer (TCP).
//!
//! Exposes the connection handle and the per-connection reader/writer tasks
//! that decode frames once before they reach the dispatcher.

pub mod connection;
pub mod tcp;

pub use connection::{Connection, SEND_QUEUE_CAPACITY};
pub use tcp::{connect, serve, spawn_connection, Keepalive, ServeOptions};
