//! # tessera
//!
//! Headless realtime client: loads settings, starts the runtime over an
//! in-memory context platform, and logs channel activity until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tessera_connection::{Frame, WsConnector};
use tessera_core::ids::OwnerId;
use tessera_pool::{ContextAttributes, ResourceKind};
use tessera_runtime::{HeadlessPlatform, HeadlessSurface, Runtime};
use tessera_settings::TesseraSettings;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Headless tessera client.
#[derive(Parser, Debug)]
#[command(name = "tessera", about = "Headless tessera realtime client")]
struct Cli {
    /// Realtime endpoint (`ws://` or `wss://`), overrides settings.
    #[arg(long)]
    endpoint: Option<String>,

    /// Auth token appended to the dial URL.
    #[arg(long)]
    token: Option<String>,

    /// Device id appended to the dial URL.
    #[arg(long)]
    device_id: Option<String>,

    /// Settings file (defaults to `~/.tessera/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `tessera_connection=trace`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Flags win over the settings file and env vars.
    fn apply(&self, settings: &mut TesseraSettings) {
        if let Some(ref endpoint) = self.endpoint {
            settings.connection.endpoint = Some(endpoint.clone());
        }
        if let Some(ref token) = self.token {
            settings.connection.auth_token = Some(token.clone());
        }
        if let Some(ref device_id) = self.device_id {
            settings.connection.device_id = Some(device_id.clone());
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .settings
        .clone()
        .unwrap_or_else(tessera_settings::settings_path);
    let mut settings = tessera_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);

    if settings.logging.json {
        tessera_core::logging::init_json_subscriber(&settings.logging.level);
    } else {
        tessera_core::logging::init_subscriber(&settings.logging.level);
    }

    if settings.connection.endpoint.is_none() {
        warn!("no endpoint configured, running offline");
    }

    let runtime = Runtime::start(settings, HeadlessPlatform::new(), Arc::new(WsConnector))
        .context("Failed to start runtime")?;

    let viewer = OwnerId::from("headless-viewer");
    match runtime.pool().acquire(
        &viewer,
        HeadlessSurface::new(1280, 720),
        ResourceKind::Primary,
        &ContextAttributes::default(),
    ) {
        Some(handle) => info!(context = %handle.id, owner = %viewer, "primary context acquired"),
        None => warn!(owner = %viewer, "no primary context available"),
    }

    let mut status = runtime.connection().watch_status();
    let mut inbound = runtime.connection().subscribe();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("Failed to listen for ctrl-c")?;
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                info!(status = ?current, "connection status changed");
            }
            frame = inbound.recv() => match frame {
                Ok(Frame::Text(text)) => info!(len = text.len(), %text, "inbound text frame"),
                Ok(Frame::Binary(bytes)) => info!(len = bytes.len(), "inbound binary frame"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "inbound frames dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Shutting down...");
    runtime.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
