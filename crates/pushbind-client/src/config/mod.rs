//! Client config loader (strict parsing).

pub mod schema;

use std::fs;

use pushbind_core::{ChannelError, Result};

pub use schema::{ChannelConfig, ChannelSection, ServerSection};

pub fn load_from_file(path: &str) -> Result<ChannelConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ChannelError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ChannelConfig> {
    let cfg: ChannelConfig = serde_yaml::from_str(s)
        .map_err(|e| ChannelError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
