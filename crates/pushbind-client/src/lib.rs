//! pushbind client library entry.
//!
//! Wires the transport seam, session state, and connection state machine
//! into the public [`Channel`] API. Consumed by the demo binary
//! (`main.rs`) and by integration tests.

pub mod channel;
pub mod config;
pub mod listener;
pub mod session;
pub mod transport;

pub use channel::{Channel, ReadyState};
pub use listener::ChannelListener;
