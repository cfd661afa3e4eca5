//! relaymesh server library entry.
//!
//! Wires the TCP transport, command dispatcher, execution queue, session
//! table, and the router registry into a server stack. Consumed by the
//! router binary (`main.rs`), by gateway/logic processes, and by integration
//! tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod exec;
pub mod gateway;
pub mod message;
pub mod obs;
pub mod ops;
pub mod router;
pub mod session;
pub mod transport;
