//! Top-level facade crate for relaymesh.
//!
//! Re-exports the core protocol types and the server library so users can depend on a single crate.

pub mod core {
    pub use relaymesh_core::*;
}

pub mod server {
    pub use relaymesh_server::*;
}
