//! pushbind demo client.
//!
//! Joins (or creates) a channel against the configured application server
//! and logs pushed payloads until ctrl-c.

use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{fmt, EnvFilter};

use pushbind_client::channel::Channel;
use pushbind_client::config;
use pushbind_client::listener::ChannelListener;
use pushbind_client::transport::cookies::CookieSession;
use pushbind_client::transport::reqwest_client::ReqwestTransport;

struct LogListener;

#[async_trait]
impl ChannelListener for LogListener {
    async fn on_open(&self) {
        tracing::info!("channel open");
    }

    async fn on_message(&self, payload: String) {
        tracing::info!(%payload, "message");
    }

    async fn on_error(&self, status: u16, text: &str) {
        tracing::warn!(status, text, "channel error");
    }

    async fn on_close(&self) {
        tracing::info!("channel closed");
    }
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_file("pushbind.yaml").expect("config load failed");

    let transport = Arc::new(CookieSession::new(ReqwestTransport::new()));
    let listener = Arc::new(LogListener);

    let channel = match (&cfg.channel.token, &cfg.channel.key) {
        (Some(token), _) => {
            Channel::join(&cfg.server.base_url, token, transport, listener)
        }
        (_, Some(key)) => {
            Channel::create(&cfg.server.base_url, key, transport, listener)
                .await
                .expect("create channel failed")
        }
        _ => unreachable!("config validation requires key or token"),
    };

    channel.open().await.expect("open failed");
    tracing::info!("channel running, ctrl-c to close");

    let _ = tokio::signal::ctrl_c().await;
    channel.close().await;
}
