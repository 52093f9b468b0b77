//! Channel client: public API and connection state machine.
//!
//! A [`Channel`] owns one logical push-messaging session. `open()` runs
//! the (mode-dependent) handshake on the caller's task, then spawns the
//! background poll loop; every later listener callback fires from that
//! loop. Connection state is a single [`ReadyState`] behind one mutex
//! shared by the caller and the loop; the loop cancels cooperatively by
//! re-checking the state at each iteration boundary, so a close may race
//! a few already-buffered deliveries (accepted behavior).

pub mod handshake;
pub mod poll;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::task::JoinHandle;

use pushbind_core::{ChannelError, Result};

use crate::listener::ChannelListener;
use crate::session::{Mode, Session};
use crate::transport::{HttpRequest, Transport};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    /// A poll-phase decode failure parks the channel here: the loop has
    /// stopped and `send()` refuses, but no close was performed.
    Error,
    Closing,
    Closed,
}

/// One logical push-messaging session.
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

pub(crate) struct ChannelInner {
    pub(crate) transport: Arc<dyn Transport>,
    listener: Mutex<Arc<dyn ChannelListener>>,
    state: Mutex<ReadyState>,
    session: Mutex<Session>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    /// Create a new channel: asks the application server to mint a token
    /// for `channel_key` (GET `<base>/token?c=<key>`).
    ///
    /// # Errors
    /// `Transport` on a non-2xx response, `ProtocolMismatch` if the token
    /// response is not the expected JSON.
    pub async fn create(
        base_url: &str,
        channel_key: &str,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn ChannelListener>,
    ) -> Result<Channel> {
        #[derive(Deserialize)]
        struct TokenResponse {
            token: String,
        }

        let base = base_url.trim_end_matches('/');
        let req = HttpRequest::get(format!("{base}/token")).query("c", channel_key);
        let resp = transport.fetch(req).await?;
        resp.ensure_success()?;

        let token: TokenResponse = serde_json::from_str(&resp.body).map_err(|e| {
            ChannelError::ProtocolMismatch(format!("token response is not json: {e}"))
        })?;

        let session = Session::new(base_url, token.token, channel_key.to_string());
        Ok(Self::from_session(session, transport, listener))
    }

    /// Join an existing channel with a server-issued token. The
    /// application key is the token's suffix after the last `-`.
    pub fn join(
        base_url: &str,
        token: &str,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn ChannelListener>,
    ) -> Channel {
        let key = Session::key_from_token(token);
        let session = Session::new(base_url, token.to_string(), key);
        Self::from_session(session, transport, listener)
    }

    fn from_session(
        session: Session,
        transport: Arc<dyn Transport>,
        listener: Arc<dyn ChannelListener>,
    ) -> Channel {
        Channel {
            inner: Arc::new(ChannelInner {
                transport,
                listener: Mutex::new(listener),
                state: Mutex::new(ReadyState::Closed),
                session: Mutex::new(session),
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ReadyState {
        self.inner.state()
    }

    /// Open the channel: run the handshake, then start the poll loop.
    ///
    /// Blocks the caller for the handshake only. A handshake failure is
    /// fatal and unretried: the listener sees `on_error` then `on_close`,
    /// the state settles back to `Closed`, and the error is returned.
    ///
    /// # Errors
    /// Also fails with `ProtocolMismatch` if the channel is not `Closed`
    /// (one open()/poll sequence per channel).
    pub async fn open(&self) -> Result<()> {
        {
            let mut state = self.inner.lock_state();
            if *state != ReadyState::Closed {
                return Err(ChannelError::ProtocolMismatch(
                    "channel is already open".into(),
                ));
            }
            *state = ReadyState::Connecting;
        }

        let mode = self.inner.mode();
        let result = match mode {
            Mode::Dev => self.open_dev().await,
            Mode::Prod => self.open_prod().await,
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "handshake failed");
            self.inner.set_state(ReadyState::Closing);
            let listener = self.inner.listener();
            let (status, text) = e.report();
            listener.on_error(status, &text).await;
            self.inner.set_state(ReadyState::Closed);
            listener.on_close().await;
        }
        result
    }

    /// Dev handshake: one GET whose body is our client id.
    async fn open_dev(&self) -> Result<()> {
        let (base, token) = self
            .inner
            .with_session(|s| (s.base_url.clone(), s.token.clone()));

        let req = HttpRequest::get(format!("{base}/connect")).query("channel", &token);
        let resp = self.inner.transport.fetch(req).await?;
        resp.ensure_success()?;

        let client_id = chomp(&resp.body).to_string();
        self.inner.with_session(|s| s.client_id = Some(client_id));

        self.inner.set_state(ReadyState::Open);
        self.inner.listener().on_open().await;
        self.spawn_poll();
        Ok(())
    }

    /// Production handshake: initialize, fetch SID, bind connect.
    async fn open_prod(&self) -> Result<()> {
        handshake::initialize(&self.inner).await?;
        handshake::fetch_sid(&self.inner).await?;
        handshake::connect(&self.inner).await?;

        self.inner.listener().on_open().await;
        self.inner.set_state(ReadyState::Open);
        self.spawn_poll();
        Ok(())
    }

    fn spawn_poll(&self) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            match inner.mode() {
                Mode::Dev => poll::dev_poll_loop(inner).await,
                Mode::Prod => poll::long_poll_loop(inner).await,
            }
        });
        *self
            .inner
            .poll_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Fire-and-forget send to the application server
    /// (POST `<base><path_suffix>`).
    ///
    /// Returns `false` without issuing a request unless the channel is
    /// open. A non-2xx response is reported through `on_error` but does
    /// not change connection state; the call still reports `true` once
    /// the request was dispatched.
    pub async fn send(&self, message: &str, path_suffix: &str) -> bool {
        if self.inner.state() != ReadyState::Open {
            return false;
        }

        let (base, key) = self
            .inner
            .with_session(|s| (s.base_url.clone(), s.application_key.clone()));
        let req = HttpRequest::post(format!("{base}{path_suffix}"))
            .form("channelKey", &key)
            .form("message", message);

        match self.inner.transport.fetch(req).await {
            Ok(resp) if resp.is_success() => {}
            Ok(resp) => {
                self.inner
                    .listener()
                    .on_error(resp.status, &resp.status_text)
                    .await;
            }
            Err(e) => {
                let (status, text) = e.report();
                self.inner.listener().on_error(status, &text).await;
            }
        }
        true
    }

    /// Close the channel. The token is gone from the server afterwards; a
    /// new channel is required to reconnect.
    ///
    /// The poll loop notices the state change at its next iteration
    /// boundary, so a few already-buffered messages may still be delivered
    /// while the close completes.
    pub async fn close(&self) {
        self.inner.set_state(ReadyState::Closing);

        if self.inner.mode() == Mode::Dev {
            // Best-effort: the dev server drops the client either way.
            let (base, token, client) = self.inner.with_session(|s| {
                (s.base_url.clone(), s.token.clone(), s.client_id.clone())
            });
            let mut req =
                HttpRequest::get(format!("{base}/disconnect")).query("channel", &token);
            if let Some(client) = client.as_deref() {
                req = req.query("client", client);
            }
            let _ = self.inner.transport.fetch(req).await;
        }

        self.inner.set_state(ReadyState::Closed);
        self.inner.listener().on_close().await;
    }

    /// Replace the listener. Guarded by the same lock that delivery
    /// dispatch clones the listener through, so replacement cannot race a
    /// callback in flight.
    pub fn set_listener(&self, listener: Arc<dyn ChannelListener>) {
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }
}

impl ChannelInner {
    fn lock_state(&self) -> MutexGuard<'_, ReadyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ReadyState {
        *self.lock_state()
    }

    pub(crate) fn set_state(&self, state: ReadyState) {
        *self.lock_state() = state;
    }

    /// Snapshot of the current listener; callbacks are invoked outside
    /// the lock.
    pub(crate) fn listener(&self) -> Arc<dyn ChannelListener> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run `f` with the session locked. Never held across an await.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    pub(crate) fn mode(&self) -> Mode {
        self.with_session(|s| s.mode)
    }
}

/// Strip one trailing `\r\n`, `\n`, or `\r`.
pub(crate) fn chomp(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .or_else(|| s.strip_suffix('\r'))
        .unwrap_or(s)
}
