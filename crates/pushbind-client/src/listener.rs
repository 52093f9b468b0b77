//! Listener capability the channel invokes into.

use async_trait::async_trait;

/// Callbacks delivered by a channel.
///
/// Apart from the synchronous dev-mode close, every callback fires from
/// the channel's background poll task, never the caller's task. All
/// methods default to no-ops so applications implement only what they
/// need.
#[async_trait]
pub trait ChannelListener: Send + Sync {
    /// The handshake completed and the channel is live.
    async fn on_open(&self) {}

    /// One application payload pushed by the server.
    async fn on_message(&self, payload: String) {
        let _ = payload;
    }

    /// A transport or protocol failure, reported as an HTTP-style status
    /// line. Not every error is fatal; check the channel state.
    async fn on_error(&self, status: u16, text: &str) {
        let _ = (status, text);
    }

    /// The channel reached its terminal closed state.
    async fn on_close(&self) {}
}
