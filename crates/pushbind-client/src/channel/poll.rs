//! Poll loops and message reduction.
//!
//! Production: a free-running long-poll against the bind endpoint.
//! Request failures back off a fixed 2.5 s and retry indefinitely while
//! the channel stays open (liveness over termination, by protocol
//! contract); a clean end of stream re-polls immediately; a decode
//! failure reports `on_error(500, ..)` and parks the channel in
//! [`ReadyState::Error`].
//!
//! Dev: a fixed 500 ms GET poll delivering non-empty bodies verbatim.

use std::sync::Arc;
use std::time::Duration;

use pushbind_core::wire::{self, WireValue};
use pushbind_core::Result;

use super::{chomp, handshake, ChannelInner, ReadyState};
use crate::transport::{BodyStream, HttpRequest, Method};

/// Backoff between failed bind poll requests.
pub const POLL_RETRY_DELAY: Duration = Duration::from_millis(2500);

/// Dev-mode poll interval.
pub const DEV_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Production long-poll loop. Runs until the channel leaves `Open` or a
/// decode failure kills the stream.
pub(crate) async fn long_poll_loop(inner: Arc<ChannelInner>) {
    let mut active: Option<ActiveStream> = None;

    while inner.state() == ReadyState::Open {
        let Some(stream) = active.as_mut() else {
            match open_poll_stream(&inner).await {
                Ok(stream) => active = Some(stream),
                Err(e) => {
                    tracing::debug!(error = %e, "bind poll request failed, backing off");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
            continue;
        };

        match stream.next_message().await {
            Ok(Some(msg)) => reduce_message(&inner, &msg).await,
            Ok(None) => {
                // Clean end of stream: re-poll immediately.
                active = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "bind stream failed");
                inner.set_state(ReadyState::Error);
                inner.listener().on_error(500, &e.to_string()).await;
                return;
            }
        }
    }

    tracing::debug!("long-poll loop stopped");
}

/// One live bind stream with its frame buffer.
struct ActiveStream {
    body: Box<dyn BodyStream>,
    frames: wire::FrameReader,
}

impl ActiveStream {
    /// Next decoded message, or `None` when the server ends the stream.
    async fn next_message(&mut self) -> Result<Option<WireValue>> {
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return wire::decode_message(&frame).map(Some);
            }
            match self.body.next_chunk().await? {
                Some(chunk) => self.frames.feed(&chunk)?,
                None => {
                    self.frames.finish()?;
                    return Ok(None);
                }
            }
        }
    }
}

async fn open_poll_stream(inner: &ChannelInner) -> Result<ActiveStream> {
    let aid = inner.with_session(|s| s.last_message_id);
    let req = handshake::bind_request(inner, Method::Get, true)
        .query("CI", "0")
        .query("AID", &aid.to_string())
        .query("TYPE", "xmlhttp");

    let resp = inner.transport.open_stream(req).await?;
    if !(200..300).contains(&resp.status) {
        return Err(pushbind_core::ChannelError::Transport {
            status: resp.status,
            text: resp.status_text,
        });
    }
    Ok(ActiveStream {
        body: resp.body,
        frames: wire::FrameReader::new(),
    })
}

/// Message reduction: acknowledge the message id, then dig for a
/// session-control payload. Shape mismatches are deliberately swallowed so
/// unknown message variants do not kill the channel.
async fn reduce_message(inner: &ChannelInner, msg: &WireValue) {
    if let Some(payload) = reduce(inner, msg) {
        inner.listener().on_message(payload).await;
    }
}

fn reduce(inner: &ChannelInner, msg: &WireValue) -> Option<String> {
    let first = msg.entry(0).ok()?;

    let new_aid = first.entry(0).ok()?.as_number().ok()?;
    inner.with_session(|s| s.last_message_id = new_aid);

    let body = first.entry(1).ok()?;
    if body.entry(0).ok()?.as_str().ok()? != "c" {
        return None;
    }

    let control = body.entry(1).ok()?;
    let session_id = control.entry(0).ok()?.as_str().ok()?;
    inner.with_session(|s| {
        if s.gsessionid.as_deref() != Some(session_id) {
            s.gsessionid = Some(session_id.to_string());
        }
    });

    let event = control.entry(1).ok()?;
    if !event
        .entry(0)
        .ok()?
        .as_str()
        .ok()?
        .eq_ignore_ascii_case("ae")
    {
        return None;
    }
    Some(event.entry(1).ok()?.as_str().ok()?.to_string())
}

/// Dev-mode poll loop: fixed-interval GETs delivering non-empty bodies
/// verbatim.
pub(crate) async fn dev_poll_loop(inner: Arc<ChannelInner>) {
    while inner.state() == ReadyState::Open {
        let (base, token, client) = inner.with_session(|s| {
            (s.base_url.clone(), s.token.clone(), s.client_id.clone())
        });
        let mut req = HttpRequest::get(format!("{base}/poll")).query("channel", &token);
        if let Some(client) = client.as_deref() {
            req = req.query("client", client);
        }

        match inner.transport.fetch(req).await {
            Ok(resp) if resp.is_success() => {
                let data = chomp(&resp.body);
                if !data.is_empty() {
                    inner.listener().on_message(data.to_string()).await;
                }
            }
            Ok(resp) => {
                inner.set_state(ReadyState::Error);
                inner
                    .listener()
                    .on_error(resp.status, &resp.status_text)
                    .await;
            }
            Err(e) => {
                inner.set_state(ReadyState::Error);
                let (status, text) = e.report();
                inner.listener().on_error(status, &text).await;
            }
        }

        tokio::time::sleep(DEV_POLL_INTERVAL).await;
    }

    tracing::debug!("dev poll loop stopped");
}
