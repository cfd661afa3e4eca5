//! Router process: server/gateway registry and its command handlers.
//!
//! All state here lives inside the executor (`RouterState`), so handlers
//! mutate it without locks.

pub mod handlers;
pub mod registry;

pub use handlers::{register_commands, resolve_server_addr, RouterState};
pub use registry::{Server, ServerRegistry, ServerType};
