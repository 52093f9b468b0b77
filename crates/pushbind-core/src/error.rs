//! Shared error type across pushbind crates.

use thiserror::Error;

use crate::wire::EntryKind;

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Unified error type used by the wire core and the channel client.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A frame length header was not a decimal number, or the stream ended
    /// inside a frame body.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    /// Wire grammar violation that lenient recovery could not absorb.
    #[error("decode failed: {0}")]
    Decode(String),
    /// A kind-checked accessor found a different entry kind.
    #[error("expected {expected} entry, found {found}")]
    TypeMismatch {
        expected: EntryKind,
        found: EntryKind,
    },
    /// Token or session verification failed during the handshake.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
    /// Non-2xx status reported by the transport collaborator.
    #[error("transport error: {status} {text}")]
    Transport { status: u16, text: String },
    /// I/O failure below the HTTP layer.
    #[error("transport i/o error: {0}")]
    Io(String),
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl ChannelError {
    /// `(status, text)` pair delivered to listener `on_error` callbacks.
    ///
    /// HTTP failures keep their status line; everything else reports as a
    /// generic 500 with the error message.
    pub fn report(&self) -> (u16, String) {
        match self {
            ChannelError::Transport { status, text } => (*status, text.clone()),
            other => (500, other.to_string()),
        }
    }
}
