//! Session cookie capture and replay.
//!
//! The bind endpoint authenticates follow-up requests with the cookies set
//! on the first response of a session. [`CookieSession`] wraps any
//! [`Transport`]: the first `Set-Cookie` values seen are captured, and
//! only the `name=value` portion (before any `;` attributes) is replayed
//! as a `Cookie` header on later requests. The jar is never reset for the
//! life of the session.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use pushbind_core::Result;

use super::{HttpRequest, HttpResponse, StreamingResponse, Transport};

/// Cookie-aware transport wrapper.
pub struct CookieSession<T> {
    inner: T,
    cookies: Mutex<Option<Vec<String>>>,
}

impl<T> CookieSession<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            cookies: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn apply(&self, req: &mut HttpRequest) {
        let guard = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cookies) = guard.as_ref() {
            for cookie in cookies {
                let pair = cookie.split(';').next().unwrap_or(cookie).trim();
                req.headers.push(("Cookie".to_string(), pair.to_string()));
            }
        }
    }

    fn capture(&self, headers: &[(String, String)]) {
        let mut guard = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() {
            return;
        }
        let set: Vec<String> = headers
            .iter()
            .filter(|(name, _)| name == "set-cookie")
            .map(|(_, value)| value.clone())
            .collect();
        if !set.is_empty() {
            tracing::debug!(count = set.len(), "captured session cookies");
            *guard = Some(set);
        }
    }
}

#[async_trait]
impl<T: Transport> Transport for CookieSession<T> {
    async fn fetch(&self, mut req: HttpRequest) -> Result<HttpResponse> {
        self.apply(&mut req);
        let resp = self.inner.fetch(req).await?;
        self.capture(&resp.headers);
        Ok(resp)
    }

    async fn open_stream(&self, mut req: HttpRequest) -> Result<StreamingResponse> {
        self.apply(&mut req);
        let resp = self.inner.open_stream(req).await?;
        self.capture(&resp.headers);
        Ok(resp)
    }
}
