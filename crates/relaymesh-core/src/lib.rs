//! relaymesh core: transport-agnostic protocol primitives and the shared error type.
//!
//! This crate defines the wire-level contracts shared by the router, gateways,
//! and logic servers: the length-prefixed frame codec, the `Package` envelope
//! carried inside data frames, and the message-id split rule. It carries no
//! networking runtime so it can be reused by any process in the cluster.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here.
//! All fallible paths surface as `RelayError`/`Result` so a malformed frame
//! from a peer never takes the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorClass, RelayError, Result};
