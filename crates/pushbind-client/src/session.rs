//! Per-channel session identifiers and counters.

use rand::Rng;

/// Production negotiation endpoint prefix (trailing slash included).
pub(crate) const PROD_TALK_URL: &str = "https://talkgadget.google.com/talkgadget/";

/// Channel path prefix on the application server.
pub(crate) const CHANNEL_PATH: &str = "/_ah/channel/";

/// Dev (local) vs production bind protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Prod,
}

/// Identifiers and counters negotiated over the lifetime of one channel.
///
/// Created at channel construction, mutated only by the handshake and the
/// poll loop, dropped at close.
#[derive(Debug, Clone)]
pub struct Session {
    pub base_url: String,
    /// Server-issued channel token.
    pub token: String,
    /// Application key: the channel-group identifier the server routes by.
    pub application_key: String,
    pub client_id: Option<String>,
    /// Secondary session id (`gsessionid`) from the initialize step; may
    /// be updated by session-control messages during polling.
    pub gsessionid: Option<String>,
    /// Session id negotiated by the fetch-SID step.
    pub sid: Option<String>,
    /// Monotonic bind request counter (`RID`), post-incremented per use.
    pub request_id: u64,
    /// Last acknowledged message id (`AID`), echoed back to the server.
    pub last_message_id: i64,
    pub mode: Mode,
}

impl Session {
    pub fn new(base_url: &str, token: String, application_key: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let mode = if base_url.contains("localhost") {
            Mode::Dev
        } else {
            Mode::Prod
        };
        Self {
            base_url,
            token,
            application_key,
            client_id: None,
            gsessionid: None,
            sid: None,
            request_id: 0,
            last_message_id: 1,
            mode,
        }
    }

    /// Application key embedded in a full token: everything after the last
    /// `-`, or the whole token when no separator is present.
    pub fn key_from_token(token: &str) -> String {
        token.rsplit('-').next().unwrap_or(token).to_string()
    }

    /// Consume the next bind request id.
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.request_id;
        self.request_id += 1;
        id
    }
}

/// 26-character base-32 request nonce (`zx`/`cn` parameters).
pub fn random_string() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuv";
    let mut rng = rand::thread_rng();
    (0..26)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_base_url() {
        let s = Session::new("http://localhost:8888/", "t".into(), "k".into());
        assert_eq!(s.mode, Mode::Dev);
        assert_eq!(s.base_url, "http://localhost:8888");

        let s = Session::new("https://app.example.com", "t".into(), "k".into());
        assert_eq!(s.mode, Mode::Prod);
    }

    #[test]
    fn key_from_token_takes_last_segment() {
        assert_eq!(Session::key_from_token("abc-def-key9"), "key9");
        assert_eq!(Session::key_from_token("nodash"), "nodash");
    }

    #[test]
    fn request_id_post_increments() {
        let mut s = Session::new("https://x", "t".into(), "k".into());
        assert_eq!(s.next_request_id(), 0);
        assert_eq!(s.next_request_id(), 1);
        assert_eq!(s.request_id, 2);
    }

    #[test]
    fn random_string_shape() {
        let s = random_string();
        assert_eq!(s.len(), 26);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
