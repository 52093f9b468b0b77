//! pushbind core: transport-free wire format and error types.
//!
//! This crate defines the reverse-engineered bind-stream grammar (array
//! messages, length-prefixed frames) and the error surface shared by the
//! client crate. It intentionally carries no transport or runtime
//! dependencies so it can be driven from any I/O layer.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! The protocol is reverse-engineered, so all parsing is written for
//! hostile/unknown input: malformed entries degrade where the wire format
//! tolerates it and surface as `ChannelError` where it does not.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod wire;

/// Shared result type.
pub use error::{ChannelError, Result};
