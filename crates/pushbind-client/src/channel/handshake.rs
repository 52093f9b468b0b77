//! Production handshake: initialize, fetch SID, bind connect.
//!
//! Strictly ordered; any failure is fatal and leaves the channel closed.
//! The negotiation endpoint serves an HTML page that inlines a
//! constructor call whose quoted arguments carry the negotiated ids —
//! reverse-engineered, so extraction is by pattern match.

use std::sync::LazyLock;

use regex::Regex;

use pushbind_core::{wire, ChannelError, Result};

use super::ChannelInner;
use crate::session::{random_string, CHANNEL_PATH, PROD_TALK_URL};
use crate::transport::{HttpRequest, Method};

static WCS_CALL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?im)chat\.WcsDataClient\(([^\)]+)\)").expect("static pattern")
});

static QUOTED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#""([^"]*?)"[\s,]*"#).expect("static pattern")
});

/// Step 1: negotiate client and session ids from the talk gadget page.
pub(crate) async fn initialize(inner: &ChannelInner) -> Result<()> {
    let (base, token) = inner.with_session(|s| (s.base_url.clone(), s.token.clone()));

    let xpc = serde_json::json!({
        "cn": random_string(),
        "tp": "null",
        "lpu": format!("{PROD_TALK_URL}xpc_blank"),
        "ppu": format!("{base}{CHANNEL_PATH}xpc_blank"),
    });

    let req = HttpRequest::get(format!("{PROD_TALK_URL}d"))
        .query("token", &token)
        .query("xpc", &xpc.to_string());
    let resp = inner.transport.fetch(req).await?;
    resp.ensure_success()?;

    let call = WCS_CALL.captures(&resp.body).ok_or_else(|| {
        ChannelError::ProtocolMismatch("no WcsDataClient call in initialize response".into())
    })?;
    let arglist = call.get(1).map(|m| m.as_str()).unwrap_or_default();

    let fields: Vec<&str> = QUOTED_FIELD
        .captures_iter(arglist)
        .take(7)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    if fields.len() < 7 {
        return Err(ChannelError::ProtocolMismatch(format!(
            "expected 7 quoted fields in initialize response, found {}",
            fields.len()
        )));
    }
    if fields[6] != token {
        return Err(ChannelError::ProtocolMismatch(
            "token does not match initialize response".into(),
        ));
    }

    inner.with_session(|s| {
        s.client_id = Some(fields[2].to_string());
        s.gsessionid = Some(fields[3].to_string());
    });
    tracing::debug!("initialize complete");
    Ok(())
}

/// Step 2: fetch the SID, a secondary session id required on every later
/// bind request.
pub(crate) async fn fetch_sid(inner: &ChannelInner) -> Result<()> {
    let req = bind_request(inner, Method::Post, false)
        .query("CVER", "1")
        .form("count", "0");
    let resp = inner.transport.fetch(req).await?;
    resp.ensure_success()?;

    let mut frames = wire::FrameReader::new();
    frames.feed(resp.body.as_bytes())?;
    let frame = frames
        .next_frame()?
        .ok_or_else(|| ChannelError::MalformedFrame("empty fetch-sid response".into()))?;
    let msg = wire::decode_message(&frame)?;

    // root[0][1] is ["c", <sid>, ...]
    let control = msg.entry(0)?.entry(1)?;
    let tag = control.entry(0)?.as_str()?;
    if tag != "c" {
        return Err(ChannelError::ProtocolMismatch(format!(
            "expected first value 'c', found {tag:?}"
        )));
    }
    let sid = control.entry(1)?.as_str()?.to_string();

    inner.with_session(|s| s.sid = Some(sid));
    tracing::debug!("sid negotiated");
    Ok(())
}

/// Step 3: announce this client on the binding. The response body is
/// discarded; reading it to completion is still required.
pub(crate) async fn connect(inner: &ChannelInner) -> Result<()> {
    let (client_id, aid) = inner.with_session(|s| {
        (
            s.client_id.clone().unwrap_or_default(),
            s.last_message_id,
        )
    });

    let req = bind_request(inner, Method::Post, false)
        .query("AID", &aid.to_string())
        .query("CVER", "1")
        .form("count", "1")
        .form("ofs", "0")
        .form("req0_m", "[\"connect-add-client\"]")
        .form("req0_c", &client_id)
        .form("req0__sc", "c");
    let resp = inner.transport.fetch(req).await?;
    resp.ensure_success()?;
    Ok(())
}

/// Bind-endpoint request with the common negotiated parameters.
///
/// `use_rpc` selects the streaming poll variant (`RID=rpc`); otherwise
/// one monotonic request id is consumed.
pub(crate) fn bind_request(inner: &ChannelInner, method: Method, use_rpc: bool) -> HttpRequest {
    inner.with_session(|s| {
        let mut req = HttpRequest::new(method, format!("{PROD_TALK_URL}dch/bind"))
            .query("VER", "8")
            .query("token", &s.token)
            .query("gsessionid", s.gsessionid.as_deref().unwrap_or(""))
            .query("clid", s.client_id.as_deref().unwrap_or(""))
            .query("prop", "data")
            .query("zx", &random_string())
            .query("t", "1");

        if use_rpc {
            req = req.query("RID", "rpc");
        } else {
            req = req.query("RID", &s.next_request_id().to_string());
        }

        if let Some(sid) = s.sid.as_deref().filter(|v| !v.is_empty()) {
            req = req.query("SID", sid);
        }
        req
    })
}
