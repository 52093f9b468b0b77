use serde::Deserialize;

use pushbind_core::{ChannelError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub version: u32,

    pub server: ServerSection,

    #[serde(default)]
    pub channel: ChannelSection,
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChannelError::Config("version must be 1".into()));
        }
        self.server.validate()?;
        self.channel.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Application server base URL, e.g. `http://localhost:8888`.
    pub base_url: String,
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ChannelError::Config("server.base_url must not be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ChannelError::Config(
                "server.base_url must start with http:// or https://".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    /// Application channel key; the client asks the server to mint a
    /// token for it. Mutually exclusive with `token`.
    #[serde(default)]
    pub key: Option<String>,

    /// Full server-issued token; skips the mint step.
    #[serde(default)]
    pub token: Option<String>,

    /// Path suffix `send()` posts application messages to.
    #[serde(default = "default_send_path")]
    pub send_path: String,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            key: None,
            token: None,
            send_path: default_send_path(),
        }
    }
}

impl ChannelSection {
    pub fn validate(&self) -> Result<()> {
        match (&self.key, &self.token) {
            (Some(_), Some(_)) => Err(ChannelError::Config(
                "channel.key and channel.token are mutually exclusive".into(),
            )),
            (None, None) => Err(ChannelError::Config(
                "one of channel.key or channel.token is required".into(),
            )),
            _ => {
                if !self.send_path.starts_with('/') {
                    return Err(ChannelError::Config(
                        "channel.send_path must start with '/'".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn default_send_path() -> String {
    "/chat".into()
}
