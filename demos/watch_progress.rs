//! Stream live progress for one scan
//!
//! ```sh
//! TAVO_API_KEY=... cargo run --example watch_progress -- <scan-id>
//! ```
//!
//! Set `TAVO_CONFIG` to load a TOML config file instead of the environment.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tavo_sdk::{ClientConfig, ConnectionEvent, MessagePump, RealtimeOperations};
use tavo_shared::codec;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let Some(scan_id) = std::env::args().nth(1) else {
        bail!("usage: watch_progress <scan-id>");
    };

    let config = match std::env::var("TAVO_CONFIG") {
        Ok(path) => ClientConfig::load(&path)
            .await
            .with_context(|| format!("loading {}", path))?,
        Err(_) => ClientConfig::from_env(),
    };
    config.validate()?;
    if config.credentials.is_empty() {
        warn!("No credentials set; the server will likely reject the handshake");
    }

    info!("Watching scan {} on {}", scan_id, config.base_url);

    let realtime = RealtimeOperations::new(&config);
    let manager = Arc::new(
        realtime
            .connect_to_scan_progress(&scan_id, config.realtime.clone())
            .await?,
    );
    let mut events = manager.subscribe_events();
    let mut pump = MessagePump::spawn(manager.clone(), 64);

    loop {
        tokio::select! {
            message = pump.messages.recv() => {
                let Some(payload) = message else {
                    info!("Progress stream ended");
                    break;
                };
                match codec::decode(&payload) {
                    Ok(msg) => info!("[{}] {}", msg.kind, msg.data),
                    Err(_) => info!("{}", String::from_utf8_lossy(&payload)),
                }
            }

            Some(err) = pump.errors.recv() => {
                warn!("Read error: {}", err);
            }

            Ok(event) = events.recv() => {
                match event {
                    ConnectionEvent::Reconnecting { attempt } => warn!("Reconnecting (attempt {})", attempt),
                    ConnectionEvent::Reconnected { attempt } => info!("Reconnected after {} attempt(s)", attempt),
                    ConnectionEvent::GaveUp { attempts } => error!("Gave up after {} attempts", attempts),
                    _ => {}
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    manager.disconnect().await;
    Ok(())
}
