//! LED controller client.
//!
//! Keeps a session to a lighting server alive and applies the JSON commands
//! it pushes:
//!
//! ```text
//! {"color": "255,0,0", "intensity": "40"}
//! {"reset": true}
//! ```
//!
//! There is no LED attached here, so commands are only logged.
//!
//! Run with: `cargo run --example client -- ws://192.168.137.1:3000/`
//! Set `RUST_LOG=coopws=debug` to see the engine's own events.

use std::sync::Arc;
use std::time::Duration;

use coopws::{Config, Message, WebSocketClient};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "ws://192.168.137.1:3000/";
const RETRY_DELAY: Duration = Duration::from_secs(3);
const PING_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, Deserialize)]
struct Command {
    color: Option<String>,
    /// Sent as a string by some servers and as a number by others.
    intensity: Option<Value>,
    #[serde(default)]
    reset: bool,
}

/// Parse `"R,G,B"` and scale it by `intensity` percent.
fn scaled_rgb(color: &str, intensity: Option<&Value>) -> Option<[u8; 3]> {
    let parts: Vec<u8> = color
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    let [r, g, b] = <[u8; 3]>::try_from(parts).ok()?;

    let percent = match intensity {
        Some(Value::Number(n)) => n.as_u64()?,
        Some(Value::String(s)) => s.trim().parse().ok()?,
        Some(_) => return None,
        None => 100,
    }
    .min(100);
    let scale = |c: u8| (u64::from(c) * percent / 100) as u8;
    Some([scale(r), scale(g), scale(b)])
}

fn apply(text: &str) {
    let command: Command = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "ignoring malformed command");
            return;
        }
    };

    if let Some(color) = &command.color {
        match scaled_rgb(color, command.intensity.as_ref()) {
            Some(rgb) => info!(?rgb, intensity = ?command.intensity, "LED updated"),
            None => warn!(%color, "invalid color, expected \"R,G,B\""),
        }
    }
    if command.reset {
        info!("reset requested");
    }
}

/// One session: handshake, then apply commands until the server goes away.
async fn run_session(client: &Arc<WebSocketClient>, url: &str) -> coopws::Result<()> {
    client.handshake(url, &[]).await?;
    info!(url, "connected");

    let pinger = {
        let client = Arc::clone(client);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PING_INTERVAL);
            ticker.tick().await;
            while client.is_open() {
                ticker.tick().await;
                if let Err(e) = client.ping(b"alive".to_vec()).await {
                    warn!(error = %e, "ping failed");
                    break;
                }
            }
        })
    };

    let result = loop {
        match client.recv().await {
            Ok(Some(Message::Text(text))) => apply(&text),
            Ok(Some(Message::Binary(data))) => warn!(len = data.len(), "ignoring binary message"),
            Ok(Some(_)) => {}
            Ok(None) => {
                info!("disconnected");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    pinger.abort();
    client.close().await;
    result
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let client = Arc::new(WebSocketClient::new(Config::embedded()));

    loop {
        tokio::select! {
            result = run_session(&client, &url) => {
                if let Err(e) = result {
                    error!(error = %e, "connection or communication error");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                client.close().await;
                return;
            }
        }
        info!(delay = ?RETRY_DELAY, "retrying");
        tokio::time::sleep(RETRY_DELAY).await;
    }
}
