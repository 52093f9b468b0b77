//! Scripted transport and recording listener shared by integration tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use pushbind_client::listener::ChannelListener;
use pushbind_client::transport::{
    BodyStream, HttpRequest, HttpResponse, StreamingResponse, Transport,
};
use pushbind_core::{ChannelError, Result};

// --------------------
// Scripted transport
// --------------------

pub enum FetchScript {
    Ok(HttpResponse),
    Err(String),
}

pub enum StreamScript {
    Err(String),
    Ok {
        status: u16,
        chunks: Vec<Vec<u8>>,
        /// Keep the stream open (block) after the chunks instead of
        /// signalling a clean end.
        hang_at_end: bool,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub kind: &'static str,
    pub req: HttpRequest,
    pub at: tokio::time::Instant,
}

#[derive(Default)]
pub struct MockTransport {
    fetches: Mutex<VecDeque<FetchScript>>,
    streams: Mutex<VecDeque<StreamScript>>,
    /// Served when the fetch script runs dry (e.g. an idle dev poll).
    default_fetch: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            status_text: match status {
                200 => "OK".into(),
                404 => "Not Found".into(),
                500 => "Internal Server Error".into(),
                _ => String::new(),
            },
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn push_fetch_ok(&self, status: u16, body: &str) {
        self.push_fetch(Self::response(status, body));
    }

    pub fn push_fetch(&self, resp: HttpResponse) {
        self.fetches.lock().unwrap().push_back(FetchScript::Ok(resp));
    }

    pub fn push_fetch_err(&self, msg: &str) {
        self.fetches
            .lock()
            .unwrap()
            .push_back(FetchScript::Err(msg.to_string()));
    }

    pub fn push_stream(&self, chunks: Vec<Vec<u8>>, hang_at_end: bool) {
        self.streams.lock().unwrap().push_back(StreamScript::Ok {
            status: 200,
            chunks,
            hang_at_end,
        });
    }

    pub fn push_stream_err(&self, msg: &str) {
        self.streams
            .lock()
            .unwrap()
            .push_back(StreamScript::Err(msg.to_string()));
    }

    pub fn set_default_fetch(&self, resp: HttpResponse) {
        *self.default_fetch.lock().unwrap() = Some(resp);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_of(&self, kind: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    fn record(&self, kind: &'static str, req: &HttpRequest) {
        self.requests.lock().unwrap().push(RecordedRequest {
            kind,
            req: req.clone(),
            at: tokio::time::Instant::now(),
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse> {
        self.record("fetch", &req);
        let script = self.fetches.lock().unwrap().pop_front();
        match script {
            Some(FetchScript::Ok(resp)) => Ok(resp),
            Some(FetchScript::Err(msg)) => Err(ChannelError::Io(msg)),
            None => {
                let default = self.default_fetch.lock().unwrap().clone();
                default.ok_or_else(|| ChannelError::Io("unscripted fetch".into()))
            }
        }
    }

    async fn open_stream(&self, req: HttpRequest) -> Result<StreamingResponse> {
        self.record("stream", &req);
        let script = self.streams.lock().unwrap().pop_front();
        match script {
            Some(StreamScript::Ok {
                status,
                chunks,
                hang_at_end,
            }) => Ok(StreamingResponse {
                status,
                status_text: String::new(),
                headers: Vec::new(),
                body: Box::new(MockBody {
                    chunks: chunks.into_iter().map(Bytes::from).collect(),
                    hang_at_end,
                }),
            }),
            Some(StreamScript::Err(msg)) => Err(ChannelError::Io(msg)),
            // Script ran dry: block so the poll loop sits idle.
            None => std::future::pending().await,
        }
    }
}

struct MockBody {
    chunks: VecDeque<Bytes>,
    hang_at_end: bool,
}

#[async_trait]
impl BodyStream for MockBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        if self.hang_at_end {
            std::future::pending().await
        } else {
            Ok(None)
        }
    }
}

// --------------------
// Recording listener
// --------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open,
    Message(String),
    Error(u16, String),
    Close,
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ChannelListener for RecordingListener {
    async fn on_open(&self) {
        self.events.lock().unwrap().push(Event::Open);
    }

    async fn on_message(&self, payload: String) {
        self.events.lock().unwrap().push(Event::Message(payload));
    }

    async fn on_error(&self, status: u16, text: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Error(status, text.to_string()));
    }

    async fn on_close(&self) {
        self.events.lock().unwrap().push(Event::Close);
    }
}

// --------------------
// Script helpers
// --------------------

/// Encode one wire frame: character count, newline, payload.
pub fn frame(payload: &str) -> Vec<u8> {
    format!("{}\n{}", payload.chars().count(), payload).into_bytes()
}

/// Minimal initialize page embedding the expected constructor call.
pub fn init_html(token: &str) -> String {
    format!(
        "<html><script>var x = new chat.WcsDataClient(\"base\", \"frame\", \
         \"client-1\", \"gsess-1\", \"x\", \"y\", \"{token}\");</script></html>"
    )
}

/// Script the three buffered handshake exchanges (initialize, fetch-sid,
/// connect) for `token`.
pub fn script_prod_handshake(mock: &MockTransport, token: &str) {
    mock.push_fetch_ok(200, &init_html(token));
    let sid_frame = String::from_utf8(frame("[[1,[\"c\",\"SID-9\"]]]")).unwrap();
    mock.push_fetch_ok(200, &sid_frame);
    mock.push_fetch_ok(200, "");
}

/// First value of a query parameter on a recorded request.
pub fn query<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// First value of a form parameter on a recorded request.
pub fn form<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.form
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Poll until `cond` holds; panics after ~10 virtual seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..2000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
