//! Overlay bridge binary: loopback WebSocket server in front of the shared
//! overlay session.

use anyhow::Result;
use clap::Parser;
use overlay_bridge::capability::{SystemProcessLocator, UnlinkedCaptureHost};
use overlay_bridge::overlay::AssetStore;
use overlay_bridge::{BridgeServer, SessionManager, DEFAULT_PORT};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "overlay-bridge", version, about = "Local radio overlay control bridge")]
struct Cli {
    /// Port for the loopback WebSocket listener.
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory holding the overlay template, signal icons, and font.
    /// Defaults to `resources/` next to the executable.
    #[arg(long)]
    resources: Option<PathBuf>,

    /// Auto-hide delay in milliseconds.
    #[arg(long, default_value_t = 4000)]
    hide_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("overlay_bridge=info")),
        )
        .init();

    let cli = Cli::parse();

    let assets = AssetStore::locate(cli.resources);
    info!(resources = %assets.resource_dir().display(), "using resource directory");

    let locator = Arc::new(SystemProcessLocator::new());
    let (runtime_tx, runtime_rx) = mpsc::unbounded_channel();
    let capture = Arc::new(UnlinkedCaptureHost::with_messages(runtime_tx));
    let session = Arc::new(
        SessionManager::new(locator, capture.clone(), capture, assets)
            .with_hide_delay(Duration::from_millis(cli.hide_delay_ms)),
    );
    let _message_drain = SessionManager::spawn_runtime_message_drain(Arc::clone(&session), runtime_rx);

    let server = BridgeServer::bind(cli.port, Arc::clone(&session)).await?;
    let addr = server.local_addr()?;
    info!(addr = %addr, "overlay bridge listening on ws://{addr}");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.run(shutdown_rx));

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = server_task.await;

    session.detach().await;
    info!("overlay bridge stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}
