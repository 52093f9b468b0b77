//! [`reqwest`]-backed implementation of [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use pushbind_core::{ChannelError, Result};

use super::{BodyStream, HttpRequest, HttpResponse, Method, StreamingResponse, Transport};

/// A [`reqwest`]-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Default settings: no request timeout, so a quiet long-poll stream
    /// stays open until the server ends it.
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Custom per-request timeout. Not suitable for the long-poll stream
    /// unless the timeout exceeds the server's poll window.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn build(&self, req: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = match req.method {
            Method::Get => self.inner.get(&req.url),
            Method::Post => self.inner.post(&req.url),
        };
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }
        if req.method == Method::Post {
            builder = builder.form(&req.form);
        }
        builder
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, req: HttpRequest) -> Result<HttpResponse> {
        let resp = self.build(&req).send().await.map_err(io_error)?;
        let status = resp.status().as_u16();
        let status_text = resp
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        let headers = collect_headers(resp.headers());
        let body = resp.text().await.map_err(io_error)?;

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }

    async fn open_stream(&self, req: HttpRequest) -> Result<StreamingResponse> {
        let resp = self.build(&req).send().await.map_err(io_error)?;
        let status = resp.status().as_u16();
        let status_text = resp
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string();
        let headers = collect_headers(resp.headers());

        Ok(StreamingResponse {
            status,
            status_text,
            headers,
            body: Box::new(ReqwestBody {
                inner: resp.bytes_stream().boxed(),
            }),
        })
    }
}

struct ReqwestBody {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

#[async_trait]
impl BodyStream for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(io_error(e)),
            None => Ok(None),
        }
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect()
}

fn io_error(e: reqwest::Error) -> ChannelError {
    ChannelError::Io(e.to_string())
}
