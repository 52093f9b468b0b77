//! Production handshake behavior against a scripted transport.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{
    form, init_html, query, script_prod_handshake, wait_until, Event, MockTransport,
    RecordingListener,
};
use pushbind_client::channel::{Channel, ReadyState};
use pushbind_client::listener::ChannelListener;
use pushbind_client::transport::{Method, Transport};
use pushbind_core::ChannelError;

const BASE: &str = "https://app.example.com";
const TOKEN: &str = "chan-key7";

fn prod_channel(mock: &Arc<MockTransport>, listener: &Arc<RecordingListener>) -> Channel {
    let transport: Arc<dyn Transport> = Arc::clone(mock) as Arc<dyn Transport>;
    let l: Arc<dyn ChannelListener> = Arc::clone(listener) as Arc<dyn ChannelListener>;
    Channel::join(BASE, TOKEN, transport, l)
}

#[tokio::test]
async fn handshake_reaches_open_with_negotiated_ids() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    script_prod_handshake(&mock, TOKEN);

    let channel = prod_channel(&mock, &listener);
    channel.open().await.unwrap();

    assert_eq!(channel.state(), ReadyState::Open);
    assert_eq!(listener.events(), vec![Event::Open]);

    let fetches = mock.requests_of("fetch");
    assert_eq!(fetches.len(), 3);

    // Initialize: talk gadget page with token and xpc descriptor.
    let init = &fetches[0].req;
    assert_eq!(init.method, Method::Get);
    assert!(init.url.ends_with("talkgadget/d"));
    assert_eq!(query(init, "token"), Some(TOKEN));
    assert!(query(init, "xpc").unwrap().contains("xpc_blank"));

    // Fetch-SID: first bind request, no SID yet.
    let sid = &fetches[1].req;
    assert_eq!(sid.method, Method::Post);
    assert!(sid.url.ends_with("dch/bind"));
    assert_eq!(query(sid, "VER"), Some("8"));
    assert_eq!(query(sid, "RID"), Some("0"));
    assert_eq!(query(sid, "clid"), Some("client-1"));
    assert_eq!(query(sid, "gsessionid"), Some("gsess-1"));
    assert_eq!(query(sid, "CVER"), Some("1"));
    assert_eq!(query(sid, "SID"), None);
    assert_eq!(form(sid, "count"), Some("0"));

    // Connect: second bind request carries the negotiated SID.
    let connect = &fetches[2].req;
    assert_eq!(query(connect, "RID"), Some("1"));
    assert_eq!(query(connect, "SID"), Some("SID-9"));
    assert_eq!(query(connect, "AID"), Some("1"));
    assert_eq!(form(connect, "count"), Some("1"));
    assert_eq!(form(connect, "ofs"), Some("0"));
    assert_eq!(form(connect, "req0_m"), Some("[\"connect-add-client\"]"));
    assert_eq!(form(connect, "req0_c"), Some("client-1"));
    assert_eq!(form(connect, "req0__sc"), Some("c"));

    channel.close().await;
}

#[tokio::test]
async fn poll_stream_uses_rpc_bind_params() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    script_prod_handshake(&mock, TOKEN);

    let channel = prod_channel(&mock, &listener);
    channel.open().await.unwrap();

    wait_until(|| !mock.requests_of("stream").is_empty()).await;
    let poll = &mock.requests_of("stream")[0].req;
    assert_eq!(poll.method, Method::Get);
    assert!(poll.url.ends_with("dch/bind"));
    assert_eq!(query(poll, "RID"), Some("rpc"));
    assert_eq!(query(poll, "SID"), Some("SID-9"));
    assert_eq!(query(poll, "CI"), Some("0"));
    assert_eq!(query(poll, "AID"), Some("1"));
    assert_eq!(query(poll, "TYPE"), Some("xmlhttp"));

    channel.close().await;
}

#[tokio::test]
async fn token_mismatch_in_initialize_is_fatal() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    mock.push_fetch_ok(200, &init_html("some-other-token"));

    let channel = prod_channel(&mock, &listener);
    let err = channel.open().await.unwrap_err();
    assert!(matches!(err, ChannelError::ProtocolMismatch(_)));

    assert_eq!(channel.state(), ReadyState::Closed);
    let events = listener.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::Error(500, _)));
    assert_eq!(events[1], Event::Close);
}

#[tokio::test]
async fn handshake_http_failure_reports_error_then_close() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    mock.push_fetch_ok(500, "");

    let channel = prod_channel(&mock, &listener);
    let err = channel.open().await.unwrap_err();
    assert!(matches!(err, ChannelError::Transport { status: 500, .. }));

    assert_eq!(channel.state(), ReadyState::Closed);
    assert_eq!(
        listener.events(),
        vec![
            Event::Error(500, "Internal Server Error".into()),
            Event::Close
        ]
    );
    // Fatal and unretried: nothing past the failed initialize.
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn open_rejects_a_channel_that_is_not_closed() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    script_prod_handshake(&mock, TOKEN);

    let channel = prod_channel(&mock, &listener);
    channel.open().await.unwrap();

    let err = channel.open().await.unwrap_err();
    assert!(matches!(err, ChannelError::ProtocolMismatch(_)));
    assert_eq!(channel.state(), ReadyState::Open);
    assert_eq!(listener.events(), vec![Event::Open]);

    channel.close().await;
}

#[tokio::test]
async fn create_mints_a_token_for_the_key() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    mock.push_fetch_ok(200, "{\"token\":\"tok-abc-key1\"}");

    let transport: Arc<dyn Transport> = Arc::clone(&mock) as Arc<dyn Transport>;
    let channel = Channel::create(BASE, "key1", transport, listener)
        .await
        .unwrap();
    assert_eq!(channel.state(), ReadyState::Closed);

    let req = &mock.requests_of("fetch")[0].req;
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.url, format!("{BASE}/token"));
    assert_eq!(query(req, "c"), Some("key1"));
}

#[tokio::test]
async fn create_rejects_a_non_json_token_response() {
    let mock = Arc::new(MockTransport::new());
    let listener = Arc::new(RecordingListener::new());
    mock.push_fetch_ok(200, "<html>login required</html>");

    let transport: Arc<dyn Transport> = Arc::clone(&mock) as Arc<dyn Transport>;
    let err = Channel::create(BASE, "key1", transport, listener)
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::ProtocolMismatch(_)));
}
