//! Transport seam: the channel core never talks HTTP directly.
//!
//! [`Transport`] abstracts one HTTP exchange the way the channel describes
//! it (URL, query parameters, optional form body). Implementations own
//! sockets, TLS, and per-request timeouts. The bind long-poll additionally
//! needs incremental body access, exposed through [`StreamingResponse`].

pub mod cookies;
pub mod reqwest_client;

use async_trait::async_trait;
use bytes::Bytes;
use pushbind_core::{ChannelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One HTTP exchange as the channel describes it.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Form-encoded body; only sent for POST.
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, name: &str, value: &str) -> Self {
        self.form.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase from the status line ("OK", "Not Found", ...).
    pub status_text: String,
    /// Response headers with lowercase names; repeated headers repeat.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header with this (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == lower)
            .map(|(_, v)| v.as_str())
    }

    /// Map a non-2xx response to the transport error kind.
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ChannelError::Transport {
                status: self.status,
                text: self.status_text.clone(),
            })
        }
    }
}

/// Incremental body chunks from a streaming response.
#[async_trait]
pub trait BodyStream: Send {
    /// Next body chunk; `None` once the server ends the stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// A streaming response: status and headers up front, body read
/// incrementally. Dropping it cancels the underlying exchange.
pub struct StreamingResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn BodyStream>,
}

/// HTTP collaborator used by the channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one exchange and buffer the whole response body.
    async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse>;

    /// Perform one exchange, returning the body as an open stream.
    async fn open_stream(&self, req: HttpRequest) -> Result<StreamingResponse>;
}
