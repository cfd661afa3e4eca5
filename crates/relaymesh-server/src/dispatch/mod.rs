//! Command dispatch.
//!
//! Maps message ids to typed handlers, tracks which services are reachable,
//! and decides per inbound message whether to run a local handler or forward
//! it to a service.

pub mod builtin;
pub mod context;
pub mod dispatcher;
pub mod registry;

pub use context::Context;
pub use dispatcher::Dispatcher;
pub use registry::{CommandRegistry, ServiceTable};
