//! Top-level facade crate for pushbind.
//!
//! Re-exports the wire core and the channel client so users can depend on
//! a single crate.

pub mod core {
    pub use pushbind_core::*;
}

pub mod client {
    pub use pushbind_client::*;
}
